use pretty_assertions::assert_eq;

use super::*;
use crate::collaborators::ResourceLoader;
use crate::error::{CollaboratorError, ExprError};
use crate::model::{LoopSpec, ResourceAction, Resources, TemplateBody, TemplateTarget};
use crate::params::{OutputParamDef, OutputSource};

/* ===================== Helpers ===================== */

fn bounds() -> Resources {
    Resources::guaranteed("100m", "64Mi")
}

/// `produce` writes one string output; `consume` takes a required string and
/// an optional integer
fn workers() -> WorkflowBuilder {
    WorkflowBuilder::new("workers")
        .add_template("produce", |t| {
            Ok(t.container()
                .image("alpine:3")
                .inline_script("echo hi > /tmp/out")
                .resources(bounds())
                .add_path_output("out", ValueType::String, "/tmp/out")?)
        })
        .unwrap()
        .add_template("consume", |t| {
            let t = t
                .add_required_input("in", ValueType::String)?
                .add_optional_input("count", |_| Ok(Expr::literal(1)))?
                .container()
                .image("alpine:3")
                .resources(bounds());
            let value = t.input("in")?;
            t.add_arg(value)
        })
        .unwrap()
}

fn steps_of(workflow: &Workflow, template: &str) -> Vec<Vec<crate::model::StepRecord>> {
    match &workflow.template(template).unwrap().body {
        TemplateBody::Steps(groups) => groups.clone(),
        other => panic!("expected steps, got {}", other.kind()),
    }
}

struct FixedLoader(Option<&'static str>);

impl ResourceLoader for FixedLoader {
    fn load(&self, path: &str) -> Result<String, CollaboratorError> {
        match self.0 {
            Some(text) => Ok(text.to_string()),
            None => Err(CollaboratorError::ResourceLoad {
                path: path.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            }),
        }
    }
}

/* ===================== Names ===================== */

#[test]
fn test_duplicate_workflow_param() {
    let err = WorkflowBuilder::new("w")
        .add_required_param("p", ValueType::String)
        .unwrap()
        .add_required_param("p", ValueType::Integer)
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::DuplicateName { kind: ScopeKind::WorkflowParameters, ref name } if name == "p"
    ));
}

#[test]
fn test_duplicate_template() {
    let err = workers()
        .add_template("produce", |t| Ok(t.steps()))
        .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateName { kind: ScopeKind::Templates, .. }));
}

#[test]
fn test_duplicate_input_and_output() {
    let err = workers()
        .add_template("t", |t| {
            t.add_required_input("x", ValueType::String)?
                .add_required_input("x", ValueType::String)
                .map(|t| t.steps())
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateName { kind: ScopeKind::Inputs, .. }));

    let err = workers()
        .add_template("t", |t| {
            t.container()
                .image("alpine:3")
                .resources(bounds())
                .add_path_output("o", ValueType::String, "/a")?
                .add_path_output("o", ValueType::String, "/b")
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateName { kind: ScopeKind::Outputs, .. }));
}

#[test]
fn test_duplicate_step_and_task() {
    let err = workers()
        .add_template("main", |t| {
            t.steps()
                .add_step("p", TemplateRef::internal("produce"), |_| Ok(()))?
                .add_step("p", TemplateRef::internal("produce"), |_| Ok(()))
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateName { kind: ScopeKind::Steps, .. }));

    let err = workers()
        .add_template("main", |t| {
            t.dag()
                .add_task("p", TemplateRef::internal("produce"), &[], |_| Ok(()))?
                .add_task("p", TemplateRef::internal("produce"), &[], |_| Ok(()))
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateName { kind: ScopeKind::Tasks, .. }));
}

#[test]
fn test_unknown_template() {
    let err = workers()
        .add_template("main", |t| {
            t.steps()
                .add_step("x", TemplateRef::internal("missing"), |_| Ok(()))
        })
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::UnknownName { kind: ScopeKind::Templates, ref name } if name == "missing"
    ));

    let err = workers().entrypoint("missing").unwrap_err();
    assert!(matches!(err, BuildError::UnknownName { kind: ScopeKind::Templates, .. }));
}

/* ===================== Arguments ===================== */

#[test]
fn test_missing_required_input() {
    let err = workers()
        .add_template("main", |t| {
            t.steps()
                .add_step("c", TemplateRef::internal("consume"), |_| Ok(()))
        })
        .unwrap_err();
    match err {
        BuildError::MissingRequiredInput {
            step,
            template,
            input,
        } => {
            assert_eq!(step, "c");
            assert_eq!(template, "consume");
            assert_eq!(input, "in");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_input() {
    let err = workers()
        .add_template("main", |t| {
            t.steps()
                .add_step("c", TemplateRef::internal("consume"), |b| {
                    b.set("in", "x")?.set("bogus", "y")?;
                    Ok(())
                })
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::UnknownInput { ref input, .. } if input == "bogus"));
}

#[test]
fn test_mistyped_argument() {
    let err = workers()
        .add_template("main", |t| {
            t.steps()
                .add_step("c", TemplateRef::internal("consume"), |b| {
                    b.set("in", "x")?.set("count", Expr::literal(2.5))?;
                    Ok(())
                })
        })
        .unwrap_err();
    match err {
        BuildError::ArgumentTypeMismatch {
            input,
            expected,
            actual,
            ..
        } => {
            assert_eq!(input, "count");
            assert_eq!(expected, ValueType::Integer);
            assert_eq!(actual, ValueType::Number);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_optional_inputs_may_be_omitted() {
    let workflow = workers()
        .add_template("main", |t| {
            t.steps()
                .add_step("c", TemplateRef::internal("consume"), |b| {
                    b.set("in", "x")?;
                    Ok(())
                })
        })
        .unwrap()
        .entrypoint("main")
        .unwrap()
        .get_full_scope()
        .unwrap();

    let groups = steps_of(&workflow, "main");
    let names: Vec<_> = groups[0][0].arguments.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["in"]);
}

#[test]
fn test_step_outputs_mirror_template_outputs() {
    let main = workers()
        .add_template("main", |t| {
            let steps = t
                .steps()
                .add_step("p", TemplateRef::internal("produce"), |_| Ok(()))?;
            assert_eq!(steps.step_output("p", "out")?.ty(), ValueType::String);

            let err = steps.step_output("p", "nope").unwrap_err();
            assert!(matches!(err, BuildError::UnknownOutput { ref output, .. } if output == "nope"));
            Ok(steps)
        })
        .unwrap();
    assert!(main.entrypoint("main").is_ok());
}

#[test]
fn test_step_output_binding() {
    let workflow = workers()
        .add_template("main", |t| {
            t.steps()
                .add_step("p", TemplateRef::internal("produce"), |_| Ok(()))?
                .add_step("c", TemplateRef::internal("consume"), |b| {
                    b.set("in", b.step_output("p", "out")?)?;
                    Ok(())
                })
        })
        .unwrap()
        .entrypoint("main")
        .unwrap()
        .get_full_scope()
        .unwrap();

    let groups = steps_of(&workflow, "main");
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1][0].template, TemplateTarget::Internal("consume".into()));
    assert_eq!(
        groups[1][0].arguments[0].1.references()[0].describe(),
        "steps.p.outputs.parameters.out"
    );
}

#[test]
fn test_later_step_is_not_visible() {
    let err = workers()
        .add_template("main", |t| {
            t.steps()
                .add_step("c", TemplateRef::internal("consume"), |b| {
                    b.set("in", b.step_output("p", "out")?)?;
                    Ok(())
                })
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::UnknownName { kind: ScopeKind::Steps, .. }));
}

#[test]
fn test_parallel_group_cannot_see_itself() {
    let err = workers()
        .add_template("main", |t| {
            t.steps().add_parallel_group(|g| {
                g.add_step("p", TemplateRef::internal("produce"), |_| Ok(()))?
                    .add_step("c", TemplateRef::internal("consume"), |b| {
                        b.set("in", b.step_output("p", "out")?)?;
                        Ok(())
                    })
            })
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::UnknownName { kind: ScopeKind::Steps, .. }));

    let workflow = workers()
        .add_template("main", |t| {
            t.steps()
                .add_parallel_group(|g| {
                    g.add_step("p1", TemplateRef::internal("produce"), |_| Ok(()))?
                        .add_step("p2", TemplateRef::internal("produce"), |_| Ok(()))
                })?
                .add_step("c", TemplateRef::internal("consume"), |b| {
                    b.set("in", b.step_output("p2", "out")?)?;
                    Ok(())
                })
        })
        .unwrap()
        .entrypoint("main")
        .unwrap()
        .get_full_scope()
        .unwrap();
    let groups = steps_of(&workflow, "main");
    assert_eq!(groups.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 1]);
}

#[test]
fn test_non_boolean_when() {
    let err = workers()
        .add_template("main", |t| {
            t.steps()
                .add_step("p", TemplateRef::internal("produce"), |b| {
                    b.when(Expr::literal(1))?;
                    Ok(())
                })
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::NonBooleanWhen { actual: ValueType::Integer, .. }));
}

/* ===================== Loops ===================== */

#[test]
fn test_looped_step_outputs_are_arrays() {
    workers()
        .add_template("main", |t| {
            let steps = t.steps().add_looped_step(
                "c",
                TemplateRef::internal("produce"),
                LoopSpec::items(vec![1, 2, 3]),
                |b| {
                    assert_eq!(b.item()?.ty(), ValueType::Integer);
                    Ok(())
                },
            )?;
            assert_eq!(
                steps.step_output("c", "out")?.ty(),
                ValueType::array(ValueType::String)
            );
            Ok(steps)
        })
        .unwrap();
}

#[test]
fn test_item_of_another_loop() {
    let err = workers()
        .add_template("main", |t| {
            t.steps().add_looped_step(
                "c",
                TemplateRef::internal("consume"),
                LoopSpec::sequence(3i64),
                |b| {
                    b.set("in", Expr::item(ValueType::String))?;
                    Ok(())
                },
            )
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::OutOfScopeReference { .. }));
}

#[test]
fn test_item_outside_loop() {
    let err = workers()
        .add_template("main", |t| {
            t.steps()
                .add_step("c", TemplateRef::internal("consume"), |b| {
                    b.set("in", b.item()?)?;
                    Ok(())
                })
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::NoLoopItem { .. }));
}

#[test]
fn test_loop_over_param_output() {
    let workflow = WorkflowBuilder::new("fan-out")
        .add_template("list", |t| {
            Ok(t.container()
                .image("alpine:3")
                .resources(bounds())
                .add_path_output("names", ValueType::array(ValueType::String), "/tmp/names")?)
        })
        .unwrap()
        .add_template("one", |t| {
            let t = t
                .add_required_input("name", ValueType::String)?
                .container()
                .image("alpine:3")
                .resources(bounds());
            let name = t.input("name")?;
            t.add_arg(name)
        })
        .unwrap()
        .add_template("main", |t| {
            let steps = t
                .steps()
                .add_step("list", TemplateRef::internal("list"), |_| Ok(()))?;
            let names = steps.step_output("list", "names")?;
            steps.add_looped_step("one", TemplateRef::internal("one"), LoopSpec::param(names), |b| {
                b.set("name", b.item()?)?;
                Ok(())
            })
        })
        .unwrap()
        .entrypoint("main")
        .unwrap()
        .get_full_scope()
        .unwrap();

    let groups = steps_of(&workflow, "main");
    assert!(matches!(groups[1][0].loop_spec, Some(LoopSpec::Param(_))));
}

#[test]
fn test_loop_specs_are_type_checked() {
    let err = workers()
        .add_template("main", |t| {
            t.steps().add_looped_step(
                "p",
                TemplateRef::internal("produce"),
                LoopSpec::sequence("three"),
                |_| Ok(()),
            )
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::Expr(ExprError::NonIntegerIndex(ValueType::String))));

    let err = workers()
        .add_template("main", |t| {
            let steps = t
                .steps()
                .add_step("p", TemplateRef::internal("produce"), |_| Ok(()))?;
            let out = steps.step_output("p", "out")?;
            steps.add_looped_step("q", TemplateRef::internal("produce"), LoopSpec::param(out), |_| Ok(()))
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::Expr(ExprError::NotAnArray(ValueType::String))));
}

/* ===================== DAG ===================== */

#[test]
fn test_unknown_dependency() {
    let err = workers()
        .add_template("main", |t| {
            t.dag()
                .add_task("p", TemplateRef::internal("produce"), &["ghost"], |_| Ok(()))
        })
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::UnknownDependency { ref task, ref dependency } if task == "p" && dependency == "ghost"
    ));
}

#[test]
fn test_task_outputs_need_a_dependency_path() {
    // c depends on b, b on a: c may read a
    let dag = workers()
        .add_template("main", |t| {
            t.dag()
                .add_task("a", TemplateRef::internal("produce"), &[], |_| Ok(()))?
                .add_task("b", TemplateRef::internal("produce"), &["a"], |_| Ok(()))?
                .add_task("c", TemplateRef::internal("consume"), &["b"], |b| {
                    b.set("in", b.task_output("a", "out")?)?;
                    Ok(())
                })
        })
        .unwrap();
    assert!(dag.entrypoint("main").is_ok());

    let err = workers()
        .add_template("main", |t| {
            t.dag()
                .add_task("a", TemplateRef::internal("produce"), &[], |_| Ok(()))?
                .add_task("d", TemplateRef::internal("consume"), &[], |b| {
                    b.set("in", b.task_output("a", "out")?)?;
                    Ok(())
                })
        })
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::UndeclaredDependency { ref referenced, .. } if referenced == "a"
    ));
}

#[test]
fn test_dag_outputs_see_every_task() {
    let workflow = workers()
        .add_template("main", |t| {
            let dag = t
                .dag()
                .add_task("a", TemplateRef::internal("produce"), &[], |_| Ok(()))?
                .add_task("b", TemplateRef::internal("produce"), &[], |_| Ok(()))?;
            let out = dag.task_output("a", "out")?;
            dag.add_expression_output("result", out)
        })
        .unwrap()
        .entrypoint("main")
        .unwrap()
        .get_full_scope()
        .unwrap();

    let main = workflow.template("main").unwrap();
    assert_eq!(main.signature.outputs.keys().collect::<Vec<_>>(), vec!["result"]);
    match &main.body {
        TemplateBody::Dag(tasks) => {
            assert_eq!(tasks.len(), 2);
            assert!(tasks.iter().all(|t| t.dependencies.is_empty()));
        }
        other => panic!("expected dag, got {}", other.kind()),
    }
}

/* ===================== Inputs and defaults ===================== */

#[test]
fn test_defaults_only_see_the_workflow_scope() {
    let base = workers().add_required_param("region", ValueType::String).unwrap();

    let ok = base.clone().add_template("t", |t| {
        Ok(t.add_optional_input("region", |s| s.workflow_param("region"))?
            .steps())
    });
    assert!(ok.is_ok());

    let err = base
        .add_template("t", |t| {
            Ok(t.add_required_input("a", ValueType::String)?
                .add_optional_input("b", |s| s.input("a"))?
                .steps())
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::OutOfScopeReference { .. }));
}

#[test]
fn test_default_type_must_match() {
    let err = workers()
        .add_template("t", |t| {
            Ok(t.add_input(
                "n",
                InputParamDef::optional_as(ValueType::Integer, Expr::string("x")),
            )?
            .steps())
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::DefaultTypeMismatch { ref name, .. } if name == "n"));
}

#[test]
fn test_workflow_params_cannot_reference_each_other() {
    let builder = WorkflowBuilder::new("w")
        .add_required_param("a", ValueType::String)
        .unwrap();
    let a = builder.param("a").unwrap();
    let err = builder.add_optional_param("b", a).unwrap_err();
    assert!(matches!(err, BuildError::OutOfScopeReference { .. }));
}

#[test]
fn test_config_map_values() {
    let cm = Expr::config_map("settings", "workers", ValueType::Integer);

    // As a whole value it is fine
    let builder = WorkflowBuilder::new("w")
        .add_optional_param("workers", cm.clone())
        .unwrap();
    assert_eq!(builder.param("workers").unwrap().ty(), ValueType::Integer);

    let err = cm.plus(Expr::literal(1)).unwrap_err();
    assert!(matches!(err, ExprError::ConfigMapNotComposable { ref map, .. } if map == "settings"));
}

#[test]
fn test_inputs_after_body_selection() {
    let workflow = workers()
        .add_template("t", |t| {
            let dag = t.dag().add_required_input("in", ValueType::String)?;
            let value = dag.input("in")?;
            dag.add_task("c", TemplateRef::internal("consume"), &[], |b| {
                b.set("in", value)?;
                Ok(())
            })
        })
        .unwrap()
        .entrypoint("t")
        .unwrap()
        .get_full_scope()
        .unwrap();
    assert!(workflow.template("t").unwrap().signature.inputs.contains("in"));
}

/* ===================== Prefix reuse ===================== */

#[test]
fn test_prefix_reuse_does_not_leak() {
    let base = WorkflowBuilder::new("w")
        .add_required_param("p", ValueType::String)
        .unwrap();

    let as_string = base.clone().add_required_param("q", ValueType::String).unwrap();
    let as_int = base.clone().add_required_param("q", ValueType::Integer).unwrap();

    assert_eq!(as_string.param("q").unwrap().ty(), ValueType::String);
    assert_eq!(as_int.param("q").unwrap().ty(), ValueType::Integer);
    assert!(matches!(
        base.param("q").unwrap_err(),
        BuildError::UnknownName { kind: ScopeKind::WorkflowParameters, .. }
    ));
}

#[test]
fn test_steps_prefix_reuse() {
    let workflow = workers();
    workflow
        .add_template("main", |t| {
            let prefix = t
                .steps()
                .add_step("p", TemplateRef::internal("produce"), |_| Ok(()))?;
            let left = prefix
                .clone()
                .add_step("left", TemplateRef::internal("produce"), |_| Ok(()))?;
            let right = prefix
                .clone()
                .add_step("right", TemplateRef::internal("produce"), |_| Ok(()))?;

            assert!(left.step_output("right", "out").is_err());
            assert!(right.step_output("left", "out").is_err());
            assert!(prefix.step_output("left", "out").is_err());
            Ok(left)
        })
        .unwrap();
}

/* ===================== Bodies ===================== */

#[test]
fn test_container_without_resources() {
    let err = WorkflowBuilder::new("w")
        .add_template("t", |t| Ok(t.container().image("alpine:3")))
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingResources { ref template } if template == "t"));

    let err = WorkflowBuilder::new("w")
        .add_template("t", |t| Ok(t.container().image("alpine:3").resources(Resources::new())))
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingResources { .. }));
}

#[test]
fn test_resource_without_resources() {
    let err = WorkflowBuilder::new("w")
        .add_template("t", |t| {
            t.resource(ResourceAction::Apply)
                .manifest(serde_json::json!({ "kind": "ConfigMap" }))
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingResources { .. }));
}

#[test]
fn test_container_without_image() {
    let err = WorkflowBuilder::new("w")
        .add_template("t", |t| Ok(t.container().resources(bounds())))
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingField { field: "container image", .. }));
}

#[test]
fn test_outputs_must_fit_the_body() {
    let err = WorkflowBuilder::new("w")
        .add_template("t", |t| {
            t.container().image("alpine:3").resources(bounds()).add_output(
                "o",
                OutputParamDef::new(ValueType::String, OutputSource::Expression(Expr::string("x"))),
            )
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::UnsupportedOutput { body: "container", .. }));

    let err = WorkflowBuilder::new("w")
        .add_template("t", |t| {
            t.steps().add_output(
                "o",
                OutputParamDef::new(ValueType::String, OutputSource::Path("/tmp/o".into())),
            )
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::UnsupportedOutput { body: "steps", .. }));
}

#[test]
fn test_expression_outputs_match_their_declared_type() {
    let mistyped = || OutputParamDef::new(ValueType::Integer, OutputSource::Expression(Expr::string("abc")));

    let err = WorkflowBuilder::new("w")
        .add_template("t", |t| t.steps().add_output("n", mistyped()))
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::OutputTypeMismatch { expected: ValueType::Integer, actual: ValueType::String, .. }
    ));

    let err = WorkflowBuilder::new("w")
        .add_template("t", |t| t.dag().add_output("n", mistyped()))
        .unwrap_err();
    assert!(matches!(err, BuildError::OutputTypeMismatch { ref output, .. } if output == "n"));

    WorkflowBuilder::new("w")
        .add_template("t", |t| {
            t.dag().add_output(
                "x",
                OutputParamDef::new(ValueType::Number, OutputSource::Expression(Expr::literal(2))),
            )
        })
        .unwrap();
}

#[test]
fn test_container_args_check_scope() {
    let err = WorkflowBuilder::new("w")
        .add_template("t", |t| {
            let c = t.container().image("alpine:3").resources(bounds());
            let stray = workers()
                .add_required_param("elsewhere", ValueType::String)?
                .param("elsewhere")?;
            c.add_arg(stray)
        })
        .unwrap_err();
    assert!(matches!(err, BuildError::OutOfScopeReference { .. }));
}

#[test]
fn test_script_from_loader() {
    let workflow = WorkflowBuilder::new("w")
        .add_template("t", |t| {
            t.container()
                .image("alpine:3")
                .resources(bounds())
                .script_from(&FixedLoader(Some("echo loaded")), "run.sh")
        })
        .unwrap()
        .entrypoint("t")
        .unwrap()
        .get_full_scope()
        .unwrap();
    match &workflow.template("t").unwrap().body {
        TemplateBody::Container(spec) => {
            assert_eq!(spec.command, vec!["/bin/sh", "-c"]);
            assert_eq!(spec.args, vec![Expr::string("echo loaded")]);
        }
        other => panic!("expected container, got {}", other.kind()),
    }

    let err = WorkflowBuilder::new("w")
        .add_template("t", |t| {
            t.container()
                .image("alpine:3")
                .resources(bounds())
                .script_from(&FixedLoader(None), "run.sh")
        })
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::Collaborator(CollaboratorError::ResourceLoad { .. })
    ));
}

/* ===================== External templates ===================== */

#[test]
fn test_external_template_ref() {
    let library = workers().entrypoint("produce").unwrap().get_full_scope().unwrap();
    let consume = TemplateRef::external(&library, "consume").unwrap();

    let workflow = WorkflowBuilder::new("caller")
        .add_template("main", |t| {
            t.steps().add_step("c", consume, |b| {
                b.set("in", "hello")?;
                Ok(())
            })
        })
        .unwrap()
        .entrypoint("main")
        .unwrap()
        .get_full_scope()
        .unwrap();

    let groups = steps_of(&workflow, "main");
    assert_eq!(
        groups[0][0].template,
        TemplateTarget::External {
            workflow: "workers".into(),
            template: "consume".into(),
        }
    );

    assert!(matches!(
        TemplateRef::external(&library, "nope").unwrap_err(),
        BuildError::UnknownName { kind: ScopeKind::Templates, .. }
    ));
}
