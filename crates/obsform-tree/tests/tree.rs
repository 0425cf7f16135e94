use std::sync::Arc;

use obsform_model::FormDefinition;
use obsform_model::Observation;
use obsform_path::FormFieldPath;
use obsform_tree::manager;
use obsform_tree::snapshot::RecordSnapshot;
use obsform_tree::view;
use obsform_tree::BuildOptions;
use obsform_tree::Record;
use obsform_tree::TreeBuilder;
use obsform_tree::TreeError;
use obsform_tree::Validator;
use serde_json::json;
use serde_json::Value;

const VITALS: &str = r#"{
    "name": "Vitals",
    "version": 2,
    "uuid": "form-vitals",
    "controls": [
        {
            "id": "1",
            "type": "obsGroupControl",
            "concept": {"uuid": "c-bp", "name": "Blood Pressure", "datatype": "N/A"},
            "properties": {"location": {"row": 0, "column": 0}, "addMore": true},
            "controls": [
                {
                    "id": "2",
                    "type": "obsControl",
                    "concept": {
                        "uuid": "c-sys", "name": "Systolic", "datatype": "Numeric",
                        "lowNormal": 90, "hiNormal": 140, "lowAbsolute": 0, "hiAbsolute": 300
                    },
                    "properties": {"location": {"row": 0, "column": 0}, "mandatory": true}
                },
                {
                    "id": "3",
                    "type": "obsControl",
                    "concept": {"uuid": "c-dia", "name": "Diastolic", "datatype": "Numeric"},
                    "properties": {"location": {"row": 0, "column": 1}}
                }
            ]
        },
        {
            "id": "4",
            "type": "obsControl",
            "concept": {"uuid": "c-sym", "name": "Symptoms", "datatype": "Coded"},
            "properties": {"location": {"row": 1, "column": 0}, "multiSelect": true}
        },
        {
            "id": "5",
            "type": "section",
            "label": {"value": "History"},
            "properties": {"location": {"row": 2, "column": 0}},
            "controls": [
                {
                    "id": "6",
                    "type": "obsControl",
                    "concept": {"uuid": "c-notes", "name": "Notes", "datatype": "Text"}
                }
            ]
        },
        {
            "id": "7",
            "type": "label",
            "label": {"value": "Signed by the attending clinician"},
            "properties": {"location": {"row": 3, "column": 0}}
        }
    ]
}"#;

const SAVED: &str = r#"[
    {
        "uuid": "o-bp-0",
        "concept": {"uuid": "c-bp", "name": "Blood Pressure"},
        "formFieldPath": "Vitals.2/1-0",
        "groupMembers": [
            {
                "uuid": "o-sys-0",
                "concept": {"uuid": "c-sys", "name": "Systolic", "datatype": "Numeric"},
                "value": 120,
                "formFieldPath": "Vitals.2/1-0/2-0"
            },
            {
                "uuid": "o-dia-0",
                "concept": {"uuid": "c-dia", "name": "Diastolic", "datatype": "Numeric"},
                "value": 80,
                "formFieldPath": "Vitals.2/1-0/3-0"
            }
        ]
    },
    {
        "uuid": "o-bp-2",
        "concept": {"uuid": "c-bp", "name": "Blood Pressure"},
        "formFieldPath": "Vitals.2/1-2",
        "groupMembers": [
            {
                "uuid": "o-sys-2",
                "concept": {"uuid": "c-sys", "name": "Systolic", "datatype": "Numeric"},
                "value": 150,
                "formFieldPath": "Vitals.2/1-2/2-0"
            }
        ]
    },
    {
        "uuid": "o-sym-fever",
        "concept": {"uuid": "c-sym", "name": "Symptoms", "datatype": "Coded"},
        "value": {"name": "Fever", "uuid": "a-fever"},
        "formFieldPath": "Vitals.2/4-0"
    },
    {
        "uuid": "o-sym-cough",
        "concept": {"uuid": "c-sym", "name": "Symptoms", "datatype": "Coded"},
        "value": {"name": "Cough", "uuid": "a-cough"},
        "formFieldPath": "Vitals.2/4-0"
    },
    {
        "uuid": "o-notes",
        "concept": {"uuid": "c-notes", "name": "Notes", "datatype": "Text"},
        "value": "Stable overnight",
        "formFieldPath": "Vitals.2/5-0/6-0"
    }
]"#;

fn vitals() -> FormDefinition {
    FormDefinition::from_json(VITALS).unwrap()
}

fn saved() -> Vec<Observation> {
    Observation::list_from_json(SAVED).unwrap()
}

fn path(raw: &str) -> FormFieldPath {
    FormFieldPath::parse(raw).unwrap()
}

fn build(observations: &[Observation]) -> Record {
    TreeBuilder::default().build(&vitals(), observations).unwrap()
}

/// `(path, uuid, value)` of every observation, members included, sorted.
fn flatten(observations: &[Observation]) -> Vec<(String, Option<String>, Option<Value>)> {
    fn visit(obs: &Observation, out: &mut Vec<(String, Option<String>, Option<Value>)>) {
        out.push((
            obs.form_field_path.to_string(),
            obs.uuid.clone(),
            obs.value.clone(),
        ));
        for member in &obs.group_members {
            visit(member, out);
        }
    }

    let mut out = Vec::new();
    for obs in observations {
        visit(obs, &mut out);
    }
    out.sort_by(|left, right| (&left.0, &left.1).cmp(&(&right.0, &right.1)));
    out
}

fn child_paths(record: &Record) -> Vec<String> {
    record
        .children()
        .iter()
        .map(|child| child.path().to_string())
        .collect()
}

mod building {
    use super::*;

    #[test]
    fn test_tree_shape() {
        let root = build(&saved());
        insta::assert_yaml_snapshot!(RecordSnapshot::from(&root), @r#"
        path: Vitals.2
        kind: section
        children:
          - path: Vitals.2/1-0
            kind: obsGroupControl
            persisted: true
            children:
              - path: Vitals.2/1-0/2-0
                kind: obsControl
                value: 120
                persisted: true
              - path: Vitals.2/1-0/3-0
                kind: obsControl
                value: 80
                persisted: true
          - path: Vitals.2/1-2
            kind: obsGroupControl
            persisted: true
            children:
              - path: Vitals.2/1-2/2-0
                kind: obsControl
                value: 150
                persisted: true
              - path: Vitals.2/1-2/3-0
                kind: obsControl
          - path: Vitals.2/4-0
            kind: obsControl
            value:
              - name: Fever
                uuid: a-fever
              - name: Cough
                uuid: a-cough
            persisted: true
          - path: Vitals.2/5-0
            kind: section
            children:
              - path: Vitals.2/5-0/6-0
                kind: obsControl
                value: Stable overnight
                persisted: true
          - path: Vitals.2/7-0
            kind: label
        "#);
    }

    #[test]
    fn test_round_trip() {
        let observations = saved();
        let root = build(&observations);
        let payload = view::to_observation_list(&root).unwrap();
        assert_eq!(flatten(&payload), flatten(&observations));
    }

    #[test]
    fn test_blank_form() {
        let root = build(&[]);
        assert_eq!(
            child_paths(&root),
            vec!["Vitals.2/1-0", "Vitals.2/4-0", "Vitals.2/5-0", "Vitals.2/7-0"]
        );
        assert_eq!(
            child_paths(&root.children()[0]),
            vec!["Vitals.2/1-0/2-0", "Vitals.2/1-0/3-0"]
        );
        assert!(view::to_observation_list(&root).unwrap().is_empty());
    }

    #[test]
    fn test_members_stay_with_their_group() {
        let mut observations = saved();
        // a member claiming another group instance is not attached
        observations[1].group_members[0].form_field_path = path("Vitals.2/1-0/2-0");
        let root = build(&observations);

        let group = manager::find(&root, &path("Vitals.2/1-2")).unwrap();
        assert!(group.children()[0].data_source().is_none());
        assert_eq!(
            manager::find(&root, &path("Vitals.2/1-0/2-0"))
                .unwrap()
                .computed_value(),
            json!(120)
        );
    }

    #[test]
    fn test_legacy_flat_paths() {
        let observations = Observation::list_from_json(
            r#"[
                {
                    "uuid": "o-bp",
                    "concept": {"uuid": "c-bp", "name": "Blood Pressure"},
                    "formFieldPath": "Vitals.2/1-1",
                    "groupMembers": [{
                        "uuid": "o-sys",
                        "concept": {"uuid": "c-sys", "name": "Systolic"},
                        "value": 130,
                        "formFieldPath": "Vitals.2/2-0"
                    }]
                },
                {
                    "uuid": "o-notes",
                    "concept": {"uuid": "c-notes", "name": "Notes"},
                    "value": "Legacy note",
                    "formFieldPath": "Vitals.2/6-0"
                }
            ]"#,
        )
        .unwrap();
        let root = build(&observations);

        assert_eq!(
            manager::find(&root, &path("Vitals.2/1-1/2-0"))
                .unwrap()
                .computed_value(),
            json!(130)
        );
        assert_eq!(
            manager::find(&root, &path("Vitals.2/5-0/6-0"))
                .unwrap()
                .computed_value(),
            json!("Legacy note")
        );

        let payload = view::to_observation_list(&root).unwrap();
        assert!(flatten(&payload)
            .iter()
            .any(|(path, _, _)| path == "Vitals.2/5-0/6-0"));

        let strict = TreeBuilder::new(BuildOptions {
            legacy_paths: false,
        })
        .build(&vitals(), &observations)
        .unwrap();
        assert!(manager::find(&strict, &path("Vitals.2/5-0/6-0"))
            .unwrap()
            .data_source()
            .is_none());
    }

    #[test]
    fn test_inactive_rows_are_history() {
        let observations = Observation::list_from_json(
            r#"[{
                "uuid": "o-old",
                "concept": {"uuid": "c-notes", "name": "Notes"},
                "value": "Superseded",
                "formFieldPath": "Vitals.2/5-0/6-0",
                "inactive": true
            }]"#,
        )
        .unwrap();
        let root = build(&observations);

        let section = manager::find(&root, &path("Vitals.2/5-0")).unwrap();
        assert_eq!(
            child_paths(section),
            vec!["Vitals.2/5-0/6-0", "Vitals.2/5-0/6-1"]
        );
        assert!(!section.children()[0].is_active());
        assert!(section.children()[1].is_active());

        let active = view::to_active_tree(&root);
        assert_eq!(
            child_paths(manager::find(&active, &path("Vitals.2/5-0")).unwrap()),
            vec!["Vitals.2/5-0/6-1"]
        );
        assert!(view::to_observation_list(&root).unwrap().is_empty());
        assert!(view::to_void_list(&root).unwrap().is_empty());
    }

    #[test]
    fn test_instance_indices_keep_their_spelling() {
        let rows = Observation::list_from_json(
            r#"[
                {
                    "uuid": "o-notes-5",
                    "concept": {"uuid": "c-notes", "name": "Notes", "datatype": "Text"},
                    "value": "five",
                    "formFieldPath": "Vitals.2/5-5/6-0"
                },
                {
                    "uuid": "o-notes-50",
                    "concept": {"uuid": "c-notes", "name": "Notes", "datatype": "Text"},
                    "value": "fifty",
                    "formFieldPath": "Vitals.2/5-50/6-0"
                }
            ]"#,
        )
        .unwrap();
        let root = build(&rows);
        let payload = view::to_observation_list(&root).unwrap();
        assert_eq!(flatten(&payload), flatten(&rows));

        let padded = Observation::list_from_json(
            r#"[{
                "uuid": "o-notes-05",
                "concept": {"uuid": "c-notes", "name": "Notes", "datatype": "Text"},
                "value": "padded",
                "formFieldPath": "Vitals.2/5-05/6-0"
            }]"#,
        );
        assert!(padded.is_err());
    }

    #[test]
    fn test_rows_of_other_forms_ignored() {
        let mut observations = saved();
        observations[4].form_field_path = path("Intake.1/5-0/6-0");
        let root = build(&observations);
        assert!(manager::find(&root, &path("Vitals.2/5-0/6-0"))
            .unwrap()
            .data_source()
            .is_none());
    }
}

mod editing {
    use super::*;

    fn repeatable_group() -> FormDefinition {
        FormDefinition::from_json(
            r#"{
                "name": "F",
                "version": "1",
                "controls": [{
                    "id": "1",
                    "type": "obsGroupControl",
                    "concept": {"uuid": "c-1", "name": "Group"},
                    "properties": {"addMore": true},
                    "controls": [{
                        "id": "2",
                        "type": "obsControl",
                        "concept": {"uuid": "c-2", "name": "Weight", "datatype": "Numeric"}
                    }]
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_add_more() {
        let root = TreeBuilder::default()
            .build(&repeatable_group(), &[])
            .unwrap();
        assert_eq!(child_paths(&root), vec!["F.1/1-0"]);
        assert_eq!(child_paths(&root.children()[0]), vec!["F.1/1-0/2-0"]);

        let added = manager::add(&root, &path("F.1/1-0")).unwrap();
        assert_eq!(child_paths(&added), vec!["F.1/1-0", "F.1/1-1"]);
        assert_eq!(child_paths(&added.children()[1]), vec!["F.1/1-1/2-0"]);
        assert!(Arc::ptr_eq(&root.children()[0], &added.children()[0]));
        assert_eq!(child_paths(&root), vec!["F.1/1-0"]);
    }

    #[test]
    fn test_added_instance_is_blank() {
        let root = build(&saved());
        let added = manager::add(&root, &path("Vitals.2/1-0")).unwrap();

        let fresh = manager::find(&added, &path("Vitals.2/1-3")).unwrap();
        assert!(!fresh.is_persisted());
        assert!(fresh
            .children()
            .iter()
            .all(|child| child.computed_value().is_null()));
        assert_eq!(
            child_paths(&added)[..3],
            ["Vitals.2/1-0", "Vitals.2/1-2", "Vitals.2/1-3"]
        );
    }

    #[test]
    fn test_removed_index_not_reused() {
        let root = build(&saved());
        let removed = manager::remove(&root, &path("Vitals.2/1-2")).unwrap();
        let added = manager::add(&removed, &path("Vitals.2/1-0")).unwrap();
        assert!(manager::find(&added, &path("Vitals.2/1-3")).is_some());
        assert!(!manager::find(&added, &path("Vitals.2/1-2"))
            .unwrap()
            .is_active());
    }

    #[test]
    fn test_add_after_last_index_fails() {
        let rows = Observation::list_from_json(&format!(
            r#"[{{
                "uuid": "o-bp-last",
                "concept": {{"uuid": "c-bp", "name": "Blood Pressure"}},
                "formFieldPath": "Vitals.2/1-{last}",
                "groupMembers": [{{
                    "uuid": "o-sys-last",
                    "concept": {{"uuid": "c-sys", "name": "Systolic", "datatype": "Numeric"}},
                    "value": 110,
                    "formFieldPath": "Vitals.2/1-{last}/2-0"
                }}]
            }}]"#,
            last = u32::MAX
        ))
        .unwrap();
        let root = build(&rows);

        let result = manager::add(&root, &path(&format!("Vitals.2/1-{}", u32::MAX)));
        assert!(matches!(
            result,
            Err(TreeError::Path(obsform_path::PathError::InstanceOverflow { .. }))
        ));
    }

    #[test]
    fn test_remove_persisted_group() {
        let root = build(&saved());
        let removed = manager::remove(&root, &path("Vitals.2/1-2")).unwrap();

        let group = manager::find(&removed, &path("Vitals.2/1-2")).unwrap();
        assert!(!group.is_active());
        assert!(group.is_voided());
        assert!(matches!(
            manager::remove(&removed, &path("Vitals.2/1-2")),
            Err(TreeError::RecordRemoved { .. })
        ));
        assert!(matches!(
            manager::update_value(&removed, &path("Vitals.2/1-2/2-0"), json!(1)),
            Err(TreeError::RecordRemoved { .. })
        ));

        let payload = view::to_observation_list(&removed).unwrap();
        assert!(!flatten(&payload)
            .iter()
            .any(|(path, _, _)| path.starts_with("Vitals.2/1-2")));

        let voids = view::to_void_list(&removed).unwrap();
        assert_eq!(voids.len(), 1);
        assert_eq!(voids[0].uuid.as_deref(), Some("o-bp-2"));
        assert!(voids[0].voided);
        assert_eq!(voids[0].group_members.len(), 1);
        assert_eq!(voids[0].group_members[0].uuid.as_deref(), Some("o-sys-2"));
        assert!(voids[0].group_members[0].voided);

        let pruned = view::to_active_tree(&removed);
        assert_eq!(view::to_active_tree(&pruned), pruned);
    }

    #[test]
    fn test_remove_unsaved_instance() {
        let root = build(&saved());
        let added = manager::add(&root, &path("Vitals.2/1-0")).unwrap();
        let removed = manager::remove(&added, &path("Vitals.2/1-3")).unwrap();
        assert!(manager::find(&removed, &path("Vitals.2/1-3")).is_none());
        assert_eq!(removed, root);
        assert!(view::to_void_list(&removed).unwrap().is_empty());
    }

    #[test]
    fn test_clearing_members_voids_group() {
        let root = build(&saved());
        let cleared = [path("Vitals.2/1-0/2-0"), path("Vitals.2/1-0/3-0")]
            .iter()
            .try_fold(root, |tree, path| {
                manager::update_value(&tree, path, Value::Null)
            })
            .unwrap();

        let group = manager::find(&cleared, &path("Vitals.2/1-0")).unwrap();
        assert!(group.is_voided());
        let brothers: Vec<String> = manager::brother_trees(&cleared, &path("Vitals.2/1-2"))
            .iter()
            .map(|record| record.path().to_string())
            .collect();
        assert_eq!(brothers, vec!["Vitals.2/1-2"]);

        let payload = view::to_observation_list(&cleared).unwrap();
        let group_obs = payload
            .iter()
            .find(|obs| obs.uuid.as_deref() == Some("o-bp-0"))
            .unwrap();
        assert!(group_obs.voided);
        assert!(group_obs.group_members.iter().all(|member| member.voided));

        let revived =
            manager::update_value(&cleared, &path("Vitals.2/1-0/3-0"), json!(75)).unwrap();
        assert!(!manager::find(&revived, &path("Vitals.2/1-0"))
            .unwrap()
            .is_voided());
        assert_eq!(
            manager::brother_trees(&revived, &path("Vitals.2/1-2")).len(),
            2
        );
    }

    #[test]
    fn test_multi_select_edit() {
        let root = build(&saved());
        let edited = manager::update_value(
            &root,
            &path("Vitals.2/4-0"),
            json!([{"name": "Cough", "uuid": "a-cough"}, {"name": "Rash", "uuid": "a-rash"}]),
        )
        .unwrap();

        let payload: Vec<Observation> = view::to_observation_list(&edited)
            .unwrap()
            .into_iter()
            .filter(|obs| obs.concept.uuid == "c-sym")
            .collect();
        insta::assert_yaml_snapshot!(payload, @r#"
        - uuid: o-sym-fever
          concept:
            uuid: c-sym
            name: Symptoms
            datatype: Coded
          value:
            name: Fever
            uuid: a-fever
          formFieldPath: Vitals.2/4-0
          voided: true
        - uuid: o-sym-cough
          concept:
            uuid: c-sym
            name: Symptoms
            datatype: Coded
          value:
            name: Cough
            uuid: a-cough
          formFieldPath: Vitals.2/4-0
          voided: false
        - concept:
            uuid: c-sym
            name: Symptoms
            datatype: Coded
          value:
            name: Rash
            uuid: a-rash
          formFieldPath: Vitals.2/4-0
          voided: false
        "#);
    }
}

mod findings {
    use super::*;

    #[test]
    fn test_error_list() {
        let root = build(&[]);
        let validated = Validator::default().validate(&root);
        let errors = view::to_error_list(&validated);
        insta::assert_yaml_snapshot!(errors, @r#"
        - type: error
          message: mandatory
        "#);
    }

    #[test]
    fn test_hidden_and_removed_records_report_nothing() {
        let root = build(&saved());
        let high = manager::update_value(&root, &path("Vitals.2/1-0/2-0"), json!(400)).unwrap();
        let validated = Validator::default().validate(&high);
        let messages: Vec<String> = view::to_error_list(&validated)
            .into_iter()
            .map(|finding| finding.message)
            .collect();
        assert_eq!(messages, vec!["allowRange", "minMaxRange", "minMaxRange"]);

        let group = manager::find(&validated, &path("Vitals.2/1-0"))
            .unwrap()
            .with_hidden(true);
        let hidden = manager::update(&validated, group).unwrap();
        assert_eq!(view::to_error_list(&hidden).len(), 1);

        let removed = manager::remove(&hidden, &path("Vitals.2/1-2")).unwrap();
        assert!(view::to_error_list(&removed).is_empty());
    }

    #[test]
    fn test_abnormal_flag_reaches_payload() {
        let root = build(&saved());
        let validated = Validator::default().validate(&root);
        let payload = view::to_observation_list(&validated).unwrap();
        let high = payload
            .iter()
            .flat_map(|obs| obs.group_members.iter())
            .find(|obs| obs.uuid.as_deref() == Some("o-sys-2"))
            .unwrap();
        assert_eq!(
            high.interpretation,
            Some(obsform_model::Interpretation::Abnormal)
        );
    }
}
