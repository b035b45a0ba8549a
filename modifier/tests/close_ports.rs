// Behavioural tests for port closing on the sample models.
//
// Loads `models/*.al` from the repository root and drives the library API
// directly (parse → modifier), checking the observable state after each
// operation.

use std::path::{Path, PathBuf};

use almod::ast::{Component, PortKind};
use almod::modifier::{close_all_reduce_ports, close_analog_port_zero, ModifyError};
use almod::query::{analog_reduce_ports, free_symbols, references_symbol};
use almod::substitute::substitute;

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn load_model(name: &str) -> Component {
    let path = project_root().join("models").join(name);
    let source = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    let mut result = almod::parser::parse(&source);
    assert!(
        result.errors.is_empty(),
        "parse errors in {}: {:?}",
        name,
        result.errors
    );
    assert_eq!(result.components.len(), 1, "{} defines one component", name);
    result.components.remove(0)
}

fn port_names(c: &Component) -> Vec<String> {
    c.ports().iter().map(|p| p.name.clone()).collect()
}

#[test]
fn sample_models_validate() {
    let lif = load_model("lif.al");
    assert!(almod::validate::validate(&lif).is_empty());
    let network = load_model("network.al");
    assert!(!almod::diag::has_errors(&almod::validate::validate(&network)));
}

#[test]
fn closing_receive_port_removes_it_and_its_references() {
    let mut c = load_model("lif.al");
    let closed = close_analog_port_zero(&mut c, "I_ext").expect("close I_ext");
    assert_eq!(closed.port.kind, PortKind::AnalogReceive);
    assert_eq!(closed.replaced, 1);
    assert!(!port_names(&c).contains(&"I_ext".to_string()));
    assert!(!references_symbol(&c, "I_ext"));

    let err = close_analog_port_zero(&mut c, "I_ext").unwrap_err();
    assert!(matches!(err, ModifyError::NoSuchPort { ref port, .. } if port == "I_ext"));
}

#[test]
fn closing_send_port_rewrites_reads_of_the_same_name() {
    // The send port `V` shares its name with the state variable, so every
    // read of `V` is rewritten while the state declaration survives.
    let mut c = load_model("lif.al");
    let closed = close_analog_port_zero(&mut c, "V").expect("close V");
    assert_eq!(closed.port.kind, PortKind::AnalogSend);
    assert!(closed.replaced >= 2);
    assert!(c.state_variables.iter().any(|s| s.name == "V"));
    assert_eq!(c.regimes[0].time_derivatives[0].variable, "V");
    assert!(!free_symbols(&c).contains("V"));
}

#[test]
fn non_flat_component_rejects_every_operation_unchanged() {
    let mut c = load_model("network.al");
    let before = c.clone();

    let err = close_analog_port_zero(&mut c, "I_bias").unwrap_err();
    assert_eq!(
        err,
        ModifyError::NotFlat {
            component: "Population".into(),
            subnodes: vec!["cell".into(), "input".into()],
        }
    );
    assert!(matches!(
        close_all_reduce_ports(&mut c, &[]),
        Err(ModifyError::NotFlat { .. })
    ));
    assert!(matches!(
        close_all_reduce_ports(&mut c, &["I_bias"]),
        Err(ModifyError::NotFlat { .. })
    ));
    assert_eq!(c, before);
}

#[test]
fn reduce_batch_honours_exclusions() {
    let mut c = load_model("lif.al");
    let closed = close_all_reduce_ports(&mut c, &["I_syn"]).expect("batch");
    let closed: Vec<_> = closed.into_iter().map(|r| r.port.name).collect();
    assert_eq!(closed, vec!["I_gap"]);

    let remaining: Vec<_> = analog_reduce_ports(&c).map(|p| p.name.as_str()).collect();
    assert_eq!(remaining, vec!["I_syn"]);
    assert!(references_symbol(&c, "I_syn"));
    assert!(!references_symbol(&c, "I_gap"));
    assert_eq!(c.aliases[0].rhs.to_string(), "I_ext + I_syn + 0");
}

#[test]
fn reduce_batch_closes_all_in_declaration_order() {
    let mut c = load_model("lif.al");
    let closed = close_all_reduce_ports(&mut c, &[]).expect("batch");
    let closed: Vec<_> = closed.iter().map(|r| r.port.name.as_str()).collect();
    assert_eq!(closed, vec!["I_syn", "I_gap"]);
    assert_eq!(analog_reduce_ports(&c).count(), 0);
    assert_eq!(port_names(&c), vec!["V", "I_ext", "spike", "reset"]);
}

#[test]
fn reduce_batch_without_reduce_ports_is_a_noop() {
    let mut c = load_model("lif.al");
    close_all_reduce_ports(&mut c, &[]).expect("first batch");
    let after_first = c.clone();
    let closed = close_all_reduce_ports(&mut c, &[]).expect("second batch");
    assert!(closed.is_empty());
    assert_eq!(c, after_first);
}

#[test]
fn substitution_after_closing_finds_nothing() {
    let mut c = load_model("lif.al");
    close_analog_port_zero(&mut c, "I_gap").expect("close I_gap");
    let after_close = c.clone();
    assert_eq!(substitute(&mut c, "I_gap", &almod::ast::Expr::zero()), 0);
    assert_eq!(c, after_close);
}

#[test]
fn duplicate_port_names_are_ambiguous_not_silently_removed() {
    let source = std::fs::read_to_string(project_root().join("models/lif.al")).unwrap();
    let source = source.replace("analog reduce I_gap +", "analog reduce I_syn +");
    let mut c = almod::parser::parse(&source).components.remove(0);

    let err = close_analog_port_zero(&mut c, "I_syn").unwrap_err();
    assert!(matches!(err, ModifyError::AmbiguousPort { count: 2, .. }));
    assert_eq!(analog_reduce_ports(&c).count(), 2);

    let err = close_all_reduce_ports(&mut c, &[]).unwrap_err();
    let ModifyError::BatchAborted { port, closed, .. } = err else {
        panic!("expected BatchAborted, got {err:?}")
    };
    assert_eq!(port, "I_syn");
    assert!(closed.is_empty());
}
