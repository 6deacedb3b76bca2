use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub enum Cmdline {
    /// Run a demo slave over TCP, handling one master connection at a time.
    Listen {
        /// Address to bind and accept connections on.
        #[structopt(long, default_value = "127.0.0.1:7590")]
        addr: String,
        /// Name advertised to the master during the handshake.
        #[structopt(long, default_value = "host-demo")]
        name: String,
        /// Idle timeout, in milliseconds, before a connected master is dropped.
        #[structopt(long, default_value = "5000")]
        idle_timeout_ms: u32,
    },
}
