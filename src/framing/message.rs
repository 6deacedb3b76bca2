/// A single framed protocol message: a channel number plus its raw
/// (still `:`-joined) payload text.
///
/// Channel 0 is the reserved control channel (SPEC_FULL.md §3).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    /// The channel this message was sent/received on.
    pub channel: u16,
    /// The message's payload, not yet split into parts.
    pub payload: String,
}

impl Message {
    /// The conventional boundary above which channel traffic resets the
    /// idle-activity timer (SPEC_FULL.md §3).
    pub const USER_CHANNEL_MIN: u16 = 20;

    /// The reserved control channel.
    pub const CONTROL: u16 = 0;

    /// Builds a new message.
    pub fn new(channel: u16, payload: impl Into<String>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }

    /// `true` if this message counts as "real activity" for the idle
    /// timer: channels `>= 20` do, lower channels do not.
    pub fn resets_idle_timer(&self) -> bool {
        self.channel >= Self::USER_CHANNEL_MIN
    }

    /// `true` if this is a control-channel message.
    pub fn is_control(&self) -> bool {
        self.channel == Self::CONTROL
    }
}
