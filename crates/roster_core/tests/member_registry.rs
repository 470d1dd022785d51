use roster_core::db::open_db_in_memory;
use roster_core::{
    CohortService, ConflictError, ErrorKind, MemberPatch, MemberService, NewCohort, NewMember,
    NotFoundError, RegistryError, SqliteCohortRepository, SqliteMemberRepository, UniqueField,
};
use rusqlite::Connection;
use std::collections::BTreeSet;
use uuid::Uuid;

type Members<'conn> = MemberService<SqliteMemberRepository<'conn>, SqliteCohortRepository<'conn>>;

fn cohort_service(conn: &Connection) -> CohortService<SqliteCohortRepository<'_>> {
    CohortService::new(SqliteCohortRepository::try_new(conn).unwrap())
}

fn member_service(conn: &Connection) -> Members<'_> {
    MemberService::new(
        SqliteMemberRepository::try_new(conn).unwrap(),
        SqliteCohortRepository::try_new(conn).unwrap(),
    )
}

fn create_cohort(cohorts: &CohortService<SqliteCohortRepository<'_>>, name: &str) -> Uuid {
    cohorts
        .create(NewCohort {
            name: name.to_string(),
            description: None,
            year: 2025,
        })
        .unwrap()
        .id
}

fn new_member(code: &str, email: &str, cohort_ids: Option<Vec<Uuid>>) -> NewMember {
    NewMember {
        member_code: code.to_string(),
        family_name: "Curie".to_string(),
        given_name: "Marie".to_string(),
        email: email.to_string(),
        cohort_ids,
    }
}

fn set_of(ids: &[Uuid]) -> BTreeSet<Uuid> {
    ids.iter().copied().collect()
}

#[test]
fn create_without_cohorts_yields_empty_membership() {
    let conn = open_db_in_memory().unwrap();
    let members = member_service(&conn);

    let record = members
        .create(new_member("S1", "s1@school.test", None))
        .unwrap();
    assert!(record.cohort_ids.is_empty());
    assert!(record.member.active);
    assert_eq!(members.find_one(record.member.id).unwrap(), record);
}

#[test]
fn duplicate_member_code_or_email_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let members = member_service(&conn);
    members
        .create(new_member("S1", "s1@school.test", None))
        .unwrap();

    let err = members
        .create(new_member("S1", "other@school.test", None))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Conflict(ConflictError::Taken {
            field: UniqueField::MemberCode,
            ..
        })
    ));

    let err = members
        .create(new_member("S2", "s1@school.test", None))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Conflict(ConflictError::Taken {
            field: UniqueField::Email,
            ..
        })
    ));
    assert_eq!(members.count().unwrap(), 1);
}

#[test]
fn create_with_unknown_cohort_fails_and_stores_nothing() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let members = member_service(&conn);
    let known = create_cohort(&cohorts, "Promo25");
    let unknown = Uuid::new_v4();

    let err = members
        .create(new_member("S1", "s1@school.test", Some(vec![known, unknown])))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    match err {
        RegistryError::NotFound(NotFoundError::CohortsMissing { missing }) => {
            assert_eq!(missing, vec![unknown]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(members.count().unwrap(), 0);
    assert_eq!(members.count_by_cohort(known).unwrap(), 0);
}

#[test]
fn duplicate_cohort_ids_collapse_into_one_membership() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let members = member_service(&conn);
    let c1 = create_cohort(&cohorts, "Promo25");

    let record = members
        .create(new_member("S1", "s1@school.test", Some(vec![c1, c1])))
        .unwrap();
    assert_eq!(record.cohort_ids, set_of(&[c1]));
    assert_eq!(members.count_by_cohort(c1).unwrap(), 1);
}

#[test]
fn update_without_cohort_ids_keeps_membership() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let members = member_service(&conn);
    let c1 = create_cohort(&cohorts, "Promo25");
    let c2 = create_cohort(&cohorts, "Promo26");
    let created = members
        .create(new_member("S1", "s1@school.test", Some(vec![c1, c2])))
        .unwrap();

    let updated = members
        .update(
            created.member.id,
            MemberPatch {
                given_name: Some("Maria".to_string()),
                ..MemberPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.member.given_name, "Maria");
    assert_eq!(updated.cohort_ids, set_of(&[c1, c2]));
}

#[test]
fn update_replaces_membership_in_full() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let members = member_service(&conn);
    let c1 = create_cohort(&cohorts, "Promo25");
    let c2 = create_cohort(&cohorts, "Promo26");
    let c3 = create_cohort(&cohorts, "Promo27");
    let created = members
        .create(new_member("S1", "s1@school.test", Some(vec![c1, c2])))
        .unwrap();
    let id = created.member.id;

    let replaced = members
        .update(
            id,
            MemberPatch {
                cohort_ids: Some(vec![c3]),
                ..MemberPatch::default()
            },
        )
        .unwrap();
    assert_eq!(replaced.cohort_ids, set_of(&[c3]));
    assert_eq!(members.count_by_cohort(c1).unwrap(), 0);

    let cleared = members
        .update(
            id,
            MemberPatch {
                cohort_ids: Some(Vec::new()),
                ..MemberPatch::default()
            },
        )
        .unwrap();
    assert!(cleared.cohort_ids.is_empty());
    assert!(members.find_one(id).unwrap().cohort_ids.is_empty());
}

#[test]
fn update_with_unknown_cohort_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let members = member_service(&conn);
    let c1 = create_cohort(&cohorts, "Promo25");
    let created = members
        .create(new_member("S1", "s1@school.test", Some(vec![c1])))
        .unwrap();
    let id = created.member.id;

    let err = members
        .update(
            id,
            MemberPatch {
                family_name: Some("Sklodowska".to_string()),
                cohort_ids: Some(vec![Uuid::new_v4()]),
                ..MemberPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::NotFound(NotFoundError::CohortsMissing { .. })
    ));

    let reloaded = members.find_one(id).unwrap();
    assert_eq!(reloaded.member.family_name, "Curie");
    assert_eq!(reloaded.cohort_ids, set_of(&[c1]));
}

#[test]
fn update_guards_code_and_email_against_other_members() {
    let conn = open_db_in_memory().unwrap();
    let members = member_service(&conn);
    let first = members
        .create(new_member("S1", "s1@school.test", None))
        .unwrap();
    let second = members
        .create(new_member("S2", "s2@school.test", None))
        .unwrap();

    let err = members
        .update(
            second.member.id,
            MemberPatch {
                email: Some("s1@school.test".to_string()),
                ..MemberPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Conflict(ConflictError::Taken {
            field: UniqueField::Email,
            ..
        })
    ));

    let unchanged = members
        .update(
            first.member.id,
            MemberPatch {
                member_code: Some("S1".to_string()),
                email: Some("s1@school.test".to_string()),
                active: Some(false),
                ..MemberPatch::default()
            },
        )
        .unwrap();
    assert!(!unchanged.member.active);
}

#[test]
fn lookups_by_code_email_and_cohort() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let members = member_service(&conn);
    let c1 = create_cohort(&cohorts, "Promo25");
    let c2 = create_cohort(&cohorts, "Promo26");

    let mut zola = new_member("S1", "s1@school.test", Some(vec![c1]));
    zola.family_name = "Zola".to_string();
    let zola = members.create(zola).unwrap();
    let mut arendt = new_member("S2", "s2@school.test", Some(vec![c1, c2]));
    arendt.family_name = "Arendt".to_string();
    let arendt = members.create(arendt).unwrap();
    members
        .create(new_member("S3", "s3@school.test", Some(vec![c2])))
        .unwrap();

    assert_eq!(members.find_by_member_code("S1").unwrap(), zola);
    assert_eq!(members.find_by_email("s2@school.test").unwrap(), arendt);
    assert!(matches!(
        members.find_by_member_code("S9").unwrap_err(),
        RegistryError::NotFound(NotFoundError::MemberCode(_))
    ));
    assert!(matches!(
        members.find_by_email("nobody@school.test").unwrap_err(),
        RegistryError::NotFound(NotFoundError::MemberEmail(_))
    ));

    let in_c1: Vec<Uuid> = members
        .find_by_cohort(c1)
        .unwrap()
        .into_iter()
        .map(|record| record.member.id)
        .collect();
    assert_eq!(in_c1, vec![arendt.member.id, zola.member.id]);
    assert_eq!(members.count_by_cohort(c1).unwrap(), 2);
    assert_eq!(members.count_by_cohort(c2).unwrap(), 2);
    assert_eq!(members.count_by_cohort(Uuid::new_v4()).unwrap(), 0);

    let family_names: Vec<String> = members
        .find_all()
        .unwrap()
        .into_iter()
        .map(|record| record.member.family_name)
        .collect();
    assert_eq!(family_names, vec!["Arendt", "Curie", "Zola"]);
}

#[test]
fn remove_drops_member_and_its_memberships() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let members = member_service(&conn);
    let c1 = create_cohort(&cohorts, "Promo25");
    let created = members
        .create(new_member("S1", "s1@school.test", Some(vec![c1])))
        .unwrap();

    members.remove(created.member.id).unwrap();

    assert_eq!(members.count().unwrap(), 0);
    assert_eq!(members.count_by_cohort(c1).unwrap(), 0);
    assert_eq!(cohorts.count().unwrap(), 1);
    assert!(matches!(
        members.remove(created.member.id).unwrap_err(),
        RegistryError::NotFound(NotFoundError::Member(_))
    ));
}
