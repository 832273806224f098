use integration_tests::{EXPERIMENT, RUN_1D, RUN_2D, init_tracing, pinch_off, tuning_db};
use pinsim_core::{
    Circuit, DataProvider, DatasetDataProvider, ErrorKind, PassthroughDataProvider,
    ProviderError, StaticDataProvider, SweepError,
};

fn load(
    inputs: Vec<pinsim_core::PinId>,
    run_id: i64,
    output: Option<&str>,
) -> (integration_tests::TuningDb, Result<DatasetDataProvider, ProviderError>) {
    init_tracing();
    let db = tuning_db();
    let provider = DatasetDataProvider::load(inputs, db.path(), EXPERIMENT, run_id, output);
    (db, provider)
}

#[test]
fn one_dimensional_provider_follows_its_input() {
    let mut circuit = Circuit::new();
    let in1 = circuit.add_pin("in1");
    let out = circuit.add_pin("out");

    let (_db, provider) = load(vec![in1], RUN_1D, None);
    circuit.set_data_provider(out, provider.unwrap()).unwrap();

    circuit.set_value(in1, 0.0);
    let out0 = circuit.value(out);

    circuit.set_value(in1, -0.5);
    let out1 = circuit.value(out);

    assert_ne!(out0, out1);
    assert!(approx::relative_eq!(out0, pinch_off(0.0)));
    assert!(approx::relative_eq!(out1, pinch_off(-0.5)));
}

#[test]
fn two_dimensional_provider_follows_its_inputs() {
    let mut circuit = Circuit::new();
    let in1 = circuit.add_pin("in1");
    let in2 = circuit.add_pin("in2");
    let out = circuit.add_pin("out");

    let (_db, provider) = load(vec![in1, in2], RUN_2D, None);
    circuit.set_data_provider(out, provider.unwrap()).unwrap();

    circuit.set_value(in1, 0.0);
    circuit.set_value(in2, 0.0);
    let out0 = circuit.value(out);

    circuit.set_value(in1, -0.5);
    circuit.set_value(in2, -0.5);
    let out1 = circuit.value(out);

    assert_ne!(out0, out1);

    // Moving a single axis is enough to select a different sample.
    circuit.set_value(in2, 0.0);
    let out2 = circuit.value(out);
    assert_ne!(out1, out2);
    assert_ne!(out0, out2);
}

#[test]
fn out_of_range_inputs_clamp_to_the_boundary() {
    let mut circuit = Circuit::new();
    let in1 = circuit.add_pin("in1");

    let (_db, provider) = load(vec![in1], RUN_1D, None);
    let provider = DataProvider::from(provider.unwrap());

    circuit.set_value(in1, -50.0);
    assert!(approx::relative_eq!(
        provider.evaluate(&circuit),
        pinch_off(-1.0)
    ));

    circuit.set_value(in1, 50.0);
    assert!(approx::relative_eq!(provider.evaluate(&circuit), pinch_off(0.0)));
}

#[test]
fn missing_database_is_not_found() {
    init_tracing();

    let err = DatasetDataProvider::load(vec![], "bad_database.db", EXPERIMENT, RUN_2D, None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(matches!(err, ProviderError::Sweep(SweepError::NotFound { .. })));
}

#[test]
fn unknown_experiment_or_run_is_a_named_lookup_error() {
    let mut circuit = Circuit::new();
    let in1 = circuit.add_pin("in1");
    let db = tuning_db();

    let err = DatasetDataProvider::load(vec![in1], db.path(), "Bad_Experiment_Name", RUN_1D, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NamedLookup);

    let err = DatasetDataProvider::load(vec![in1], db.path(), EXPERIMENT, 987_654_321, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NamedLookup);
}

#[test]
fn named_output_parameter_is_used() {
    let mut circuit = Circuit::new();
    let in1 = circuit.add_pin("in1");

    let (_db, provider) = load(vec![in1], RUN_1D, Some("sr860_2_R_current"));
    let provider = provider.unwrap();
    assert_eq!(provider.output_name(), "sr860_2_R_current");

    let value = DataProvider::from(provider).evaluate(&circuit);
    assert_ne!(value, 0.0);
    assert!(approx::relative_eq!(value, 0.5 * pinch_off(0.0)));
}

#[test]
fn default_output_is_first_recorded_parameter() {
    let mut circuit = Circuit::new();
    let in1 = circuit.add_pin("in1");

    let (_db, provider) = load(vec![in1], RUN_1D, None);
    let provider = provider.unwrap();
    assert_eq!(provider.output_name(), "sr860_1_R_current");
    assert_ne!(DataProvider::from(provider).evaluate(&circuit), 0.0);
}

#[test]
fn unknown_output_parameter_is_a_key_error() {
    let mut circuit = Circuit::new();
    let in1 = circuit.add_pin("in1");

    let (_db, provider) = load(vec![in1], RUN_1D, Some("BAD_PARAM_NAME"));

    match provider {
        Err(ProviderError::Sweep(SweepError::UnknownOutput { name, available })) => {
            assert_eq!(name, "BAD_PARAM_NAME");
            assert_eq!(available, ["sr860_1_R_current", "sr860_2_R_current"]);
        }
        other => panic!("expected an unknown output error, got {other:?}"),
    }
}

#[test]
fn too_few_input_bindings_are_rejected() {
    let mut circuit = Circuit::new();
    let in1 = circuit.add_pin("in1");

    let (_db, provider) = load(vec![], RUN_1D, None);
    assert!(matches!(
        provider,
        Err(ProviderError::Arity {
            expected: 1,
            actual: 0
        })
    ));

    let (_db, provider) = load(vec![in1], RUN_2D, None);
    assert!(matches!(
        provider,
        Err(ProviderError::Arity {
            expected: 2,
            actual: 1
        })
    ));
}

#[test]
fn too_many_input_bindings_are_rejected() {
    let mut circuit = Circuit::new();
    let in1 = circuit.add_pin("in1");
    let in2 = circuit.add_pin("in2");
    let in3 = circuit.add_pin("in3");

    let (_db, provider) = load(vec![in1, in2], RUN_1D, None);
    assert_eq!(provider.unwrap_err().kind(), ErrorKind::Arity);

    let (_db, provider) = load(vec![in1, in2, in3], RUN_2D, None);
    assert_eq!(provider.unwrap_err().kind(), ErrorKind::Arity);
}

#[test]
#[allow(clippy::approx_constant)]
fn static_provider_overrides_direct_value() {
    let mut circuit = Circuit::new();
    let o1 = circuit.add_pin("O1");

    circuit.set_value(o1, 1.0);
    circuit
        .set_data_provider(o1, StaticDataProvider::new(3.14))
        .unwrap();

    assert_eq!(circuit.value(o1), 3.14);
}

#[test]
fn passthrough_provider_keeps_pins_in_step() {
    fn assert_the_same(circuit: &Circuit, pins: [pinsim_core::PinId; 2], value: f64) {
        assert_eq!(circuit.value(pins[0]), value);
        assert_eq!(circuit.value(pins[1]), value);
    }

    let mut circuit = Circuit::new();
    let pin1 = circuit.add_pin("Pin1");
    let pin2 = circuit.add_pin("Pin2");

    circuit
        .set_data_provider(pin2, PassthroughDataProvider::new(pin1))
        .unwrap();
    assert_the_same(&circuit, [pin1, pin2], 0.0);

    circuit.set_value(pin1, 1.0);
    assert_the_same(&circuit, [pin1, pin2], 1.0);

    circuit.set_value(pin2, 2.0);
    assert_the_same(&circuit, [pin1, pin2], 2.0);
}

#[test]
fn providers_on_the_same_run_share_one_sweep() {
    init_tracing();
    let db = tuning_db();

    let mut circuit = Circuit::new();
    let gate = circuit.add_pin("gate");
    let first = circuit
        .dataset_provider(vec![gate], db.path(), EXPERIMENT, RUN_1D, None)
        .unwrap();
    let second = circuit
        .dataset_provider(vec![gate], db.path(), EXPERIMENT, RUN_1D, Some("sr860_2_R_current"))
        .unwrap();

    assert!(std::rc::Rc::ptr_eq(first.sweep(), second.sweep()));
    assert_eq!(circuit.sweeps().len(), 1);
}

#[test]
fn dataset_driven_by_a_passthrough_chain() {
    init_tracing();
    let db = tuning_db();

    let mut circuit = Circuit::new();
    let knob = circuit.add_pin("knob");
    let gate = circuit.add_pin("gate");
    let out = circuit.add_pin("out");

    circuit
        .set_data_provider(gate, PassthroughDataProvider::new(knob))
        .unwrap();
    let provider = circuit
        .dataset_provider(vec![gate], db.path(), EXPERIMENT, RUN_1D, None)
        .unwrap();
    circuit.set_data_provider(out, provider).unwrap();

    circuit.set_value(knob, -1.0);
    assert!(approx::relative_eq!(circuit.value(out), pinch_off(-1.0)));

    circuit.set_value(gate, -0.5);
    assert!(approx::relative_eq!(circuit.value(out), pinch_off(-0.5)));

    // The dataset output cannot feed back into its own input.
    assert!(
        circuit
            .set_data_provider(knob, PassthroughDataProvider::new(out))
            .is_err()
    );
}
