use eval_logger_mlflow_tracking::{MlflowLoggerConfig, MlflowTrackingClient};

#[test]
fn test_unreachable_server_is_an_error() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = MlflowLoggerConfig::default().tracking_uri("http://127.0.0.1:9");
    let err = MlflowTrackingClient::build_logger(&config, ()).err().unwrap();
    assert!(format!("{:#}", err).contains("127.0.0.1:9"));
}

#[test]
fn test_run_needs_experiment() {
    let client = MlflowTrackingClient::new("http://127.0.0.1:9");
    let err = client.create_logger("run").err().unwrap();
    assert!(err.to_string().contains("Experiment is not set"));
}
