// crates/hubcore/tests/model_test.rs

use hubcore::{
    is_module, is_slave_hub, Connection, ConnectionKind, Endpoint, ModuleInstance, ParamType,
    ParamValue, Parameter, Port, PortDirection, MASTER_HUB, SESSION,
};

#[test]
fn test_parameter_link_key_ignores_orientation() {
    let a = Endpoint::new(3, "scale");
    let b = Endpoint::new(1, "scale");

    let forward = Connection::new(a.clone(), b.clone(), ConnectionKind::Parameter);
    let backward = Connection::new(b.clone(), a.clone(), ConnectionKind::Parameter);

    assert_eq!(forward.key(), backward.key());
}

#[test]
fn test_port_connection_key_keeps_direction() {
    let out = Endpoint::new(1, "out0");
    let input = Endpoint::new(2, "in0");

    let forward = Connection::new(out.clone(), input.clone(), ConnectionKind::Port);
    let backward = Connection::new(input, out, ConnectionKind::Port);

    assert_ne!(forward.key(), backward.key());
}

#[test]
fn test_parameter_default_tracks_value() {
    let mut param = Parameter::new("filename", ParamValue::from(""));
    assert!(param.is_default());

    param.value = ParamValue::from("x.vtk");
    assert!(!param.is_default());
    assert_eq!(param.value.param_type(), ParamType::String);
}

#[test]
fn test_forget_drops_every_reference() {
    let mut module = ModuleInstance::new(1, "Reader", MASTER_HUB);
    let mut port = Port::new("out0", PortDirection::Output);
    port.connections.push(Endpoint::new(2, "in0"));
    port.connections.push(Endpoint::new(3, "in0"));
    module.ports.push(port);
    let mut param = Parameter::new("step", ParamValue::Int(1));
    param.connections.push(Endpoint::new(2, "step"));
    module.parameters.push(param);

    module.forget(2);

    assert_eq!(module.ports[0].connections, vec![Endpoint::new(3, "in0")]);
    assert!(module.parameters[0].connections.is_empty());
}

#[test]
fn test_id_conventions() {
    assert!(!is_module(SESSION));
    assert!(is_module(1));
    assert!(!is_slave_hub(MASTER_HUB));
    assert!(is_slave_hub(MASTER_HUB - 1));
    assert_eq!(ParamType::from_name("IntVector"), Some(ParamType::IntVector));
    assert_eq!(ParamType::from_name("Bool"), None);
}
