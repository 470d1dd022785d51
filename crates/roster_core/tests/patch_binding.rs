use roster_core::{CohortPatch, IdentityPatch, IdentityRole, MemberPatch, NewIdentity, NewMember};
use uuid::Uuid;

#[test]
fn member_patch_distinguishes_absent_from_empty_cohort_list() {
    let absent: MemberPatch = serde_json::from_str(r#"{"given_name":"Ada"}"#).unwrap();
    assert_eq!(absent.cohort_ids, None);
    assert_eq!(absent.given_name.as_deref(), Some("Ada"));

    let empty: MemberPatch = serde_json::from_str(r#"{"cohort_ids":[]}"#).unwrap();
    assert_eq!(empty.cohort_ids, Some(Vec::new()));

    let id = Uuid::new_v4();
    let listed: MemberPatch =
        serde_json::from_str(&format!(r#"{{"cohort_ids":["{id}","{id}"]}}"#)).unwrap();
    assert_eq!(listed.cohort_ids, Some(vec![id, id]));
}

#[test]
fn cohort_patch_description_is_tri_state() {
    let absent: CohortPatch = serde_json::from_str(r#"{"year":2026}"#).unwrap();
    assert_eq!(absent.description, None);

    let cleared: CohortPatch = serde_json::from_str(r#"{"description":null}"#).unwrap();
    assert_eq!(cleared.description, Some(None));

    let replaced: CohortPatch = serde_json::from_str(r#"{"description":"day track"}"#).unwrap();
    assert_eq!(replaced.description, Some(Some("day track".to_string())));
}

#[test]
fn new_identity_role_defaults_to_guest() {
    let input: NewIdentity = serde_json::from_str(
        r#"{"family_name":"Lovelace","given_name":"Ada","wallet_address":"0xabc"}"#,
    )
    .unwrap();
    assert_eq!(input.role, IdentityRole::Guest);

    let patch: IdentityPatch = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
    assert_eq!(patch.role, Some(IdentityRole::Admin));
}

#[test]
fn new_member_cohort_ids_are_optional() {
    let input: NewMember = serde_json::from_str(
        r#"{"member_code":"S1","family_name":"Lovelace","given_name":"Ada","email":"ada@school.test"}"#,
    )
    .unwrap();
    assert_eq!(input.cohort_ids, None);
}
