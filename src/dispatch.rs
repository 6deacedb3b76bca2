//! The protocol dispatcher (C7): parses a payload's operation tag,
//! routes to a port operation via the registry, and formats the reply.

use crate::bindings::StreamingBindings;
use crate::codec;
use crate::error::{Error, ErrorCode, Result};
use crate::port::{AnalogMode, DigitalMode, Line, Port, Reference};
use crate::registry::PortRegistry;

/// The separator between concatenated per-port states in a `gAPS` reply.
const APS_SEPARATOR: char = '\r';

/// Dispatches one non-streaming, non-control payload.
///
/// Returns `Ok(Some(parts))` with the reply payload's parts (not yet
/// joined/framed), `Ok(None)` for a tag the dispatcher does not
/// recognize (silently ignored, per SPEC_FULL.md §4.6 interop
/// tolerance), or `Err` for a request that failed — always a
/// request-local error here, since arity/type/range failures on a
/// non-control channel are never session-fatal.
pub fn dispatch(
    registry: &mut PortRegistry,
    bindings: &mut StreamingBindings,
    payload: &str,
    extended: bool,
) -> Result<Option<Vec<String>>> {
    let parts = codec::split(payload, ':', 8, false)?;
    let tag = parts.first().map(String::as_str).unwrap_or("");

    match tag {
        "gDC" => Ok(Some(get_device_caps(registry))),
        "gPI" => Ok(Some(get_port_info(registry, arg(&parts, 1)?)?)),
        "gDS" => Ok(Some(digital_state(registry, arg(&parts, 1)?)?)),
        "sDL" => {
            set_line(registry, arg(&parts, 1)?, arg(&parts, 2)?)?;
            Ok(Some(digital_state(registry, arg(&parts, 1)?)?))
        }
        "sDM" => {
            set_digital_mode(registry, arg(&parts, 1)?, arg(&parts, 2)?)?;
            Ok(Some(digital_state(registry, arg(&parts, 1)?)?))
        }
        "gAS" => Ok(Some(analog_state(registry, arg(&parts, 1)?)?)),
        "sAV" => {
            set_analog_value(registry, arg(&parts, 1)?, arg(&parts, 2)?)?;
            Ok(Some(analog_state(registry, arg(&parts, 1)?)?))
        }
        "sAM" => {
            set_analog_mode(registry, arg(&parts, 1)?, arg(&parts, 2)?)?;
            Ok(Some(analog_state(registry, arg(&parts, 1)?)?))
        }
        "sAR" => {
            set_analog_resolution(registry, arg(&parts, 1)?, arg(&parts, 2)?)?;
            Ok(Some(analog_state(registry, arg(&parts, 1)?)?))
        }
        "sARF" => {
            set_analog_reference(registry, arg(&parts, 1)?, arg(&parts, 2)?)?;
            Ok(Some(analog_state(registry, arg(&parts, 1)?)?))
        }
        "gSS" => Ok(Some(select_state(registry, arg(&parts, 1)?)?)),
        "gSL" => Ok(Some(select_label(registry, arg(&parts, 1)?, arg(&parts, 2)?)?)),
        "sSP" => {
            set_select_position(registry, arg(&parts, 1)?, arg(&parts, 2)?)?;
            Ok(Some(select_state(registry, arg(&parts, 1)?)?))
        }
        "gDLS" => Ok(Some(dial_state(registry, arg(&parts, 1)?)?)),
        "sDLP" => {
            set_dial_position(registry, arg(&parts, 1)?, arg(&parts, 2)?)?;
            Ok(Some(dial_state(registry, arg(&parts, 1)?)?))
        }
        "bSP" => {
            let port_id = arg(&parts, 1)?;
            let channel = codec::parse_u16(arg(&parts, 2)?)?;
            bindings.bind(registry, port_id, channel)?;
            log::debug!("bound streaming port {} to channel {}", port_id, channel);
            Ok(Some(vec!["OK".to_string()]))
        }
        "uSP" => {
            let port_id = arg(&parts, 1)?;
            bindings.unbind(registry, port_id)?;
            log::debug!("unbound streaming port {}", port_id);
            Ok(Some(vec!["OK".to_string()]))
        }
        "gAPS" if extended => Ok(Some(get_all_port_states(registry))),
        _ => {
            log::debug!("ignoring unrecognized request tag {:?}", tag);
            Ok(None)
        }
    }
}

fn arg<'a>(parts: &'a [String], i: usize) -> Result<&'a str> {
    parts
        .get(i)
        .map(String::as_str)
        .ok_or_else(|| Error::request(ErrorCode::ProtocolError))
}

fn find<'a>(registry: &'a mut PortRegistry, id: &str) -> Result<&'a mut Port> {
    registry
        .find_by_id_mut(id, true)
        .ok_or_else(|| Error::request(ErrorCode::PortUnknown))
}

fn get_device_caps(registry: &PortRegistry) -> Vec<String> {
    let ids: Vec<&str> = registry.iter().map(Port::id).collect();
    vec!["BDC".to_string(), ids.join(",")]
}

fn get_port_info(registry: &mut PortRegistry, id: &str) -> Result<Vec<String>> {
    let port = find(registry, id)?;
    let mut out = vec!["PI".to_string(), id.to_string()];
    out.extend(port.info_parts());
    Ok(out)
}

fn get_all_port_states(registry: &mut PortRegistry) -> Vec<String> {
    let bodies: Vec<String> = registry
        .iter()
        .map(|p| format!("{}:{}", p.id(), p.state_parts().join(":")))
        .collect();
    vec!["APS".to_string(), bodies.join(&APS_SEPARATOR.to_string())]
}

fn digital_state(registry: &mut PortRegistry, id: &str) -> Result<Vec<String>> {
    let port = find(registry, id)?;
    let p = match port {
        Port::Digital(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    let mut out = vec!["DS".to_string(), id.to_string()];
    out.extend(p.state_parts());
    Ok(out)
}

fn set_line(registry: &mut PortRegistry, id: &str, value: &str) -> Result<()> {
    find(registry, id)?.meta().require_writable()?;
    let port = find(registry, id)?;
    let p = match port {
        Port::Digital(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    p.set_line(Line::from_wire(value)?);
    Ok(())
}

fn set_digital_mode(registry: &mut PortRegistry, id: &str, value: &str) -> Result<()> {
    find(registry, id)?.meta().require_writable()?;
    let port = find(registry, id)?;
    let p = match port {
        Port::Digital(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    p.set_mode(DigitalMode::from_wire(value)?);
    Ok(())
}

fn analog_state(registry: &mut PortRegistry, id: &str) -> Result<Vec<String>> {
    let port = find(registry, id)?;
    let p = match port {
        Port::Analog(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    let mut out = vec!["AS".to_string(), id.to_string()];
    out.extend(p.state_parts());
    Ok(out)
}

fn set_analog_value(registry: &mut PortRegistry, id: &str, value: &str) -> Result<()> {
    find(registry, id)?.meta().require_writable()?;
    let port = find(registry, id)?;
    let p = match port {
        Port::Analog(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    p.set_value(codec::parse_u64(value)? as u32)
}

fn set_analog_mode(registry: &mut PortRegistry, id: &str, value: &str) -> Result<()> {
    find(registry, id)?.meta().require_writable()?;
    let port = find(registry, id)?;
    let p = match port {
        Port::Analog(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    p.set_mode(AnalogMode::from_wire(value)?);
    Ok(())
}

fn set_analog_resolution(registry: &mut PortRegistry, id: &str, value: &str) -> Result<()> {
    find(registry, id)?.meta().require_writable()?;
    let port = find(registry, id)?;
    let p = match port {
        Port::Analog(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    let code: u8 = codec::parse_u8(value)?;
    if code > 4 {
        return Err(Error::request(ErrorCode::PositionInvalid));
    }
    p.set_resolution(8 + code)
}

fn set_analog_reference(registry: &mut PortRegistry, id: &str, value: &str) -> Result<()> {
    find(registry, id)?.meta().require_writable()?;
    let port = find(registry, id)?;
    let p = match port {
        Port::Analog(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    p.set_reference(Reference::from_wire(value)?);
    Ok(())
}

fn select_state(registry: &mut PortRegistry, id: &str) -> Result<Vec<String>> {
    let port = find(registry, id)?;
    let p = match port {
        Port::Select(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    let mut out = vec!["SS".to_string(), id.to_string()];
    out.extend(p.state_parts());
    Ok(out)
}

fn select_label(registry: &mut PortRegistry, id: &str, position: &str) -> Result<Vec<String>> {
    let port = find(registry, id)?;
    let p = match port {
        Port::Select(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    let position = codec::parse_u16(position)?;
    let label = p.label_at(position)?.to_string();
    Ok(vec!["SL".to_string(), id.to_string(), position.to_string(), label])
}

fn set_select_position(registry: &mut PortRegistry, id: &str, value: &str) -> Result<()> {
    find(registry, id)?.meta().require_writable()?;
    let port = find(registry, id)?;
    let p = match port {
        Port::Select(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    p.set_position(codec::parse_u16(value)?)
}

fn dial_state(registry: &mut PortRegistry, id: &str) -> Result<Vec<String>> {
    let port = find(registry, id)?;
    let p = match port {
        Port::Dial(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    let mut out = vec!["DLS".to_string(), id.to_string()];
    out.extend(p.state_parts());
    Ok(out)
}

fn set_dial_position(registry: &mut PortRegistry, id: &str, value: &str) -> Result<()> {
    find(registry, id)?.meta().require_writable()?;
    let port = find(registry, id)?;
    let p = match port {
        Port::Dial(_, p) => p,
        _ => return Err(Error::request(ErrorCode::WrongPortType)),
    };
    p.set_position(codec::parse_i32(value)? as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{AnalogPort, DialPort, Direction, DigitalPort, PortMeta, Reference, SelectPort};

    fn registry() -> PortRegistry {
        let mut reg = PortRegistry::new();
        reg.add_port(Port::Digital(
            PortMeta::new("D1", "D1", Direction::Bidi),
            DigitalPort::new(DigitalMode::Output, Line::Low),
        ))
        .unwrap();
        reg.add_port(Port::Analog(
            PortMeta::new("A1", "A1", Direction::Bidi),
            AnalogPort::new(AnalogMode::Input, Reference::Internal, 10).unwrap(),
        ))
        .unwrap();
        reg.add_port(Port::Select(
            PortMeta::new("S1", "S1", Direction::Bidi),
            SelectPort::new(vec!["A".into(), "B".into(), "C".into()]).unwrap(),
        ))
        .unwrap();
        reg.add_port(Port::Dial(
            PortMeta::new("DL1", "DL1", Direction::Bidi),
            DialPort::new(0, 100, 10).unwrap(),
        ))
        .unwrap();
        reg
    }

    #[test]
    fn gdc_lists_ids_in_order() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        let reply = dispatch(&mut reg, &mut bindings, "gDC", false).unwrap().unwrap();
        assert_eq!(reply, vec!["BDC".to_string(), "D1,A1,S1,DL1".to_string()]);
    }

    #[test]
    fn set_line_round_trips_state() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        let reply = dispatch(&mut reg, &mut bindings, "sDL:D1:1", false).unwrap().unwrap();
        assert_eq!(reply, vec!["DS", "D1", "3", "1"]);
    }

    #[test]
    fn select_rejection_leaves_position_unchanged() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        let err = dispatch(&mut reg, &mut bindings, "sSP:S1:5", false).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PositionInvalid));
        let reply = dispatch(&mut reg, &mut bindings, "gSS:S1", false).unwrap().unwrap();
        assert_eq!(reply, vec!["SS", "S1", "0"]);
    }

    #[test]
    fn unknown_tag_is_ignored() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        assert!(dispatch(&mut reg, &mut bindings, "zzz:D1", false).unwrap().is_none());
    }

    #[test]
    fn unknown_port_is_rejected() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        let err = dispatch(&mut reg, &mut bindings, "gDS:nope", false).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PortUnknown));
    }

    #[test]
    fn wrong_port_type_is_rejected() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        let err = dispatch(&mut reg, &mut bindings, "gAS:D1", false).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::WrongPortType));
    }

    #[test]
    fn set_analog_resolution_rejects_out_of_range_code_without_overflow() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        let err = dispatch(&mut reg, &mut bindings, "sAR:A1:250", false).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PositionInvalid));
    }

    #[test]
    fn port_info_echoes_id_and_type_tag() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        let reply = dispatch(&mut reg, &mut bindings, "gPI:D1", false).unwrap().unwrap();
        assert_eq!(&reply[..3], &["PI", "D1", "0"]);
    }

    #[test]
    fn select_label_by_position() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        let reply = dispatch(&mut reg, &mut bindings, "gSL:S1:1", false).unwrap().unwrap();
        assert_eq!(reply, vec!["SL", "S1", "1", "B"]);
    }

    #[test]
    fn select_label_out_of_range_is_rejected() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        let err = dispatch(&mut reg, &mut bindings, "gSL:S1:9", false).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PositionInvalid));
    }

    #[test]
    fn gaps_requires_extended_variant() {
        let mut reg = registry();
        let mut bindings = StreamingBindings::new();
        assert!(dispatch(&mut reg, &mut bindings, "gAPS", false).unwrap().is_none());
        assert!(dispatch(&mut reg, &mut bindings, "gAPS", true).unwrap().unwrap()[0] == "APS");
    }
}
