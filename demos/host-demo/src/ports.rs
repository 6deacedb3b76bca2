use portwire::port::{AnalogMode, AnalogPort, DigitalMode, DigitalPort, Direction, Line, Port, PortMeta, Reference};
use portwire::{Error, PortRegistry};

/// Builds and prepares a small registry standing in for real hardware: one
/// output line and one input-side analog reading.
pub fn demo_registry() -> Result<PortRegistry, Error> {
    let mut registry = PortRegistry::new();

    registry.add_port(Port::Digital(
        PortMeta::new("D1", "Status LED", Direction::Output).with_group("digital"),
        DigitalPort::new(DigitalMode::Output, Line::Low),
    ))?;

    registry.add_port(Port::Analog(
        PortMeta::new("A1", "Supply Voltage", Direction::Input).with_group("analog"),
        AnalogPort::new(AnalogMode::Input, Reference::Internal, 10)?,
    ))?;

    registry.prepare()?;
    Ok(registry)
}
