use serde_json::{json, Value};

use keyloom_compile::{compile_json, validate_definition_json};

/// Definition document mirroring a leasing schema: three item types, ID
/// aliases, a last-modified TTL, and two migrations.
fn lease_definition() -> Value {
    json!({
        "type_aliases": [
            { "name": "UserID", "of": "uuid" },
            { "name": "ResourceID", "of": "uuid" },
            { "name": "LeaseID", "of": "uuid" }
        ],
        "item_types": [
            {
                "name": "User",
                "key_path": ["/user-:id", "/user_email-:email"],
                "fields": [
                    { "name": "id", "type": "UserID", "initial_value": "uuid" },
                    { "name": "displayName", "type": "string" },
                    { "name": "email", "type": "string", "valid": "this.matches(\"[^@]+@[^@]+\")" },
                    { "name": "createdAt", "type": "timestampMilliseconds", "from_metadata": "createdAtTime" }
                ]
            },
            {
                "name": "Resource",
                "key_path": "/res-:id",
                "fields": [
                    { "name": "id", "type": "ResourceID", "initial_value": "uuid" },
                    { "name": "name", "type": "string" },
                    { "name": "createdAt", "type": "timestampMilliseconds", "from_metadata": "createdAtTime" }
                ]
            },
            {
                "name": "Lease",
                "key_path": [
                    "/user-:user_id/res-:res_id/lease-:id",
                    "/res-:res_id/lease-:id",
                    "/lease-:id"
                ],
                "ttl": { "source": "fromLastModified", "field": "duration" },
                "fields": [
                    { "name": "id", "type": "LeaseID", "initial_value": "uuid" },
                    { "name": "user_id", "type": "UserID" },
                    { "name": "res_id", "type": "ResourceID" },
                    { "name": "reason", "type": "string" },
                    { "name": "duration", "type": "durationSeconds", "required": false },
                    { "name": "lastTouched", "type": "timestampMilliseconds", "from_metadata": "lastModifiedAtTime" },
                    { "name": "createdAt", "type": "timestampMilliseconds", "from_metadata": "createdAtTime" }
                ]
            }
        ],
        "migrations": [
            {
                "version": 1,
                "description": "Add approver and rename lease fields",
                "changes": [
                    {
                        "item_type": "Lease",
                        "ops": [
                            { "op": "add_field", "field": { "name": "approver", "type": "UserID", "required": false } },
                            { "op": "rename_field", "from": "res_id", "to": "resource_id" },
                            { "op": "rename_field", "from": "duration", "to": "duration_seconds" }
                        ]
                    }
                ]
            },
            {
                "version": 2,
                "description": "Make reason not required",
                "changes": [
                    {
                        "item_type": "Lease",
                        "ops": [
                            { "op": "mark_not_required", "field": "reason", "backfill": "No reason given" }
                        ]
                    }
                ]
            }
        ]
    })
}

#[test]
fn definition_document_passes_structural_validation() {
    let report = validate_definition_json(&lease_definition()).expect("validate definition json");
    assert!(report.errors.is_empty(), "structural errors found: {:?}", report.errors);
}

#[test]
fn compiles_lease_definition_end_to_end() {
    let compiled = compile_json(&lease_definition()).expect("definition should compile");

    assert_eq!(compiled.chain.versions.len(), 3);
    assert_eq!(compiled.chain.current().version, 2);

    let lease = compiled.current.item_type("Lease").expect("Lease");
    assert!(lease.has_field("resource_id"));
    assert!(lease.has_field("duration_seconds"));
    assert!(lease.has_field("approver"));
    assert!(!lease.field("reason").unwrap().required);
    assert_eq!(
        lease.field("reason").unwrap().backfill,
        Some(json!("No reason given"))
    );
    assert_eq!(
        lease.key_paths[0].raw,
        "/user-:user_id/res-:resource_id/lease-:id"
    );
    assert_eq!(lease.ttl.as_ref().unwrap().field, "duration_seconds");

    let user = compiled.current.item_type("User").expect("User");
    assert_eq!(user.key_paths.len(), 2);
    assert_eq!(user.key_paths[1].raw, "/user_email-:email");
}

#[test]
fn compiling_twice_yields_byte_identical_artifacts() {
    let first = compile_json(&lease_definition()).expect("first compile");
    let second = compile_json(&lease_definition()).expect("second compile");

    let first_json = serde_json::to_vec(&first).expect("serialize first");
    let second_json = serde_json::to_vec(&second).expect("serialize second");
    assert_eq!(first_json, second_json);
    assert_eq!(first.current.fingerprint, second.current.fingerprint);
}

#[test]
fn unknown_key_path_field_is_surfaced_with_context() {
    let mut definition = lease_definition();
    definition["item_types"][2]["key_path"][2] = json!("/lease-:lease_key");
    let report = compile_json(&definition).unwrap_err();

    assert_eq!(report.errors.len(), 1);
    let issue = &report.errors[0];
    assert_eq!(issue.code, "definition_error");
    assert!(issue.message.contains("lease_key"));
    assert!(issue.message.contains("Lease"));
}

#[test]
fn structurally_invalid_document_reports_pointer_paths() {
    let bad = json!({
        "item_types": [
            { "name": "User", "fields": [] }
        ]
    });
    let report = compile_json(&bad).unwrap_err();
    assert!(!report.errors.is_empty());
    assert!(report.errors.iter().all(|issue| issue.code == "schema_violation"));
}

#[test]
fn out_of_order_migration_is_surfaced() {
    let mut definition = lease_definition();
    definition["migrations"][0]["version"] = json!(2);
    definition["migrations"][1]["version"] = json!(1);
    let report = compile_json(&definition).unwrap_err();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].message.contains("out-of-order"));
}

#[test]
fn unsafe_required_add_is_surfaced() {
    let mut definition = lease_definition();
    definition["migrations"][0]["changes"][0]["ops"][0] = json!({
        "op": "add_field",
        "field": { "name": "approver", "type": "UserID" }
    });
    let report = compile_json(&definition).unwrap_err();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].message.contains("approver"));
    assert!(report.errors[0].message.contains("required"));
}
