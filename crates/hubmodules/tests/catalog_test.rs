// crates/hubmodules/tests/catalog_test.rs

use hubcore::{ParamValue, MASTER_HUB};
use hubsession::{LocalSession, SessionConfig, SessionControl};
use std::sync::Arc;

#[test]
fn test_standard_registry_lists_all_types() {
    let registry = hubmodules::standard_registry();

    assert_eq!(
        registry.list_module_types(),
        vec!["Color", "IsoSurface", "Reader", "Renderer", "Writer"]
    );

    let reader = registry.get_metadata("Reader").expect("Reader is registered");
    assert_eq!(reader.category, "io");
    assert!(reader.inputs.is_empty());
    assert_eq!(reader.outputs[0].name, "grid_out");
}

#[tokio::test]
async fn test_spawned_module_has_declared_ports_and_defaults() {
    let session = LocalSession::new(
        SessionConfig::default(),
        Arc::new(hubmodules::standard_registry()),
    );

    let iso = session.spawn(MASTER_HUB, "IsoSurface").await.unwrap();

    assert_eq!(
        session.input_ports(iso).await.unwrap(),
        vec!["data_in", "mapdata_in"]
    );
    assert_eq!(session.output_ports(iso).await.unwrap(), vec!["data_out"]);
    assert_eq!(
        session.parameters(iso).await.unwrap(),
        vec!["isovalue", "isopoint", "point_or_value"]
    );
    assert_eq!(
        session.parameter(iso, "isopoint").await.unwrap(),
        ParamValue::Vector(vec![0.0, 0.0, 0.0])
    );
    assert!(session.is_parameter_default(iso, "isovalue").await.unwrap());
}
