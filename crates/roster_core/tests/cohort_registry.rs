use roster_core::db::open_db_in_memory;
use roster_core::{
    CohortPatch, CohortService, ConflictError, ErrorKind, MemberService, NewCohort, NewMember,
    NotFoundError, RegistryError, SqliteCohortRepository, SqliteMemberRepository, UniqueField,
};
use rusqlite::Connection;
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

fn new_cohort(name: &str, year: i32) -> NewCohort {
    NewCohort {
        name: name.to_string(),
        description: None,
        year,
    }
}

fn new_member(code: &str, family_name: &str, cohort_ids: Vec<Uuid>) -> NewMember {
    NewMember {
        member_code: code.to_string(),
        family_name: family_name.to_string(),
        given_name: "Alex".to_string(),
        email: format!("{}@school.test", code.to_lowercase()),
        cohort_ids: Some(cohort_ids),
    }
}

#[test]
fn duplicate_cohort_name_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);

    let created = cohorts.create(new_cohort("Promo25", 2025)).unwrap();
    assert!(created.active);

    let err = cohorts.create(new_cohort("Promo25", 2026)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(matches!(
        err,
        RegistryError::Conflict(ConflictError::Taken {
            field: UniqueField::CohortName,
            ..
        })
    ));
    assert_eq!(cohorts.count().unwrap(), 1);
}

#[test]
fn find_all_orders_by_year_desc_then_name() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    cohorts.create(new_cohort("Beta", 2024)).unwrap();
    cohorts.create(new_cohort("Gamma", 2025)).unwrap();
    cohorts.create(new_cohort("Alpha", 2024)).unwrap();

    let names: Vec<String> = cohorts
        .find_all()
        .unwrap()
        .into_iter()
        .map(|cohort| cohort.name)
        .collect();
    assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
}

#[test]
fn find_active_skips_deactivated_cohorts() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let open = cohorts.create(new_cohort("Open", 2025)).unwrap();
    let closed = cohorts.create(new_cohort("Closed", 2025)).unwrap();

    cohorts
        .update(
            closed.id,
            CohortPatch {
                active: Some(false),
                ..CohortPatch::default()
            },
        )
        .unwrap();

    let active: Vec<Uuid> = cohorts
        .find_active()
        .unwrap()
        .into_iter()
        .map(|cohort| cohort.id)
        .collect();
    assert_eq!(active, vec![open.id]);
    assert_eq!(cohorts.find_all().unwrap().len(), 2);
}

#[test]
fn find_one_includes_members_ordered_by_name() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let members = member_service(&conn);
    let cohort = cohorts.create(new_cohort("Promo25", 2025)).unwrap();
    let other = cohorts.create(new_cohort("Promo26", 2026)).unwrap();

    members
        .create(new_member("S2", "Zola", vec![cohort.id]))
        .unwrap();
    members
        .create(new_member("S1", "Arendt", vec![cohort.id, other.id]))
        .unwrap();
    members.create(new_member("S3", "Morin", vec![other.id])).unwrap();

    let record = cohorts.find_one(cohort.id).unwrap();
    assert_eq!(record.cohort, cohort);
    let family_names: Vec<&str> = record
        .members
        .iter()
        .map(|member| member.family_name.as_str())
        .collect();
    assert_eq!(family_names, vec!["Arendt", "Zola"]);
}

#[test]
fn update_renames_and_guards_name_uniqueness() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let first = cohorts.create(new_cohort("Promo25", 2025)).unwrap();
    let second = cohorts.create(new_cohort("Promo26", 2026)).unwrap();

    let err = cohorts
        .update(
            second.id,
            CohortPatch {
                name: Some("Promo25".to_string()),
                ..CohortPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Conflict(ConflictError::Taken {
            field: UniqueField::CohortName,
            ..
        })
    ));

    // Keeping its own name is not a conflict.
    let same = cohorts
        .update(
            first.id,
            CohortPatch {
                name: Some("Promo25".to_string()),
                year: Some(2027),
                ..CohortPatch::default()
            },
        )
        .unwrap();
    assert_eq!(same.name, "Promo25");
    assert_eq!(same.year, 2027);

    let renamed = cohorts
        .update(
            second.id,
            CohortPatch {
                name: Some("Promo26-bis".to_string()),
                ..CohortPatch::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Promo26-bis");
    assert_eq!(cohorts.find_one(second.id).unwrap().cohort.name, "Promo26-bis");
}

#[test]
fn description_can_be_set_kept_and_cleared() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let cohort = cohorts
        .create(NewCohort {
            name: "Promo25".to_string(),
            description: Some("evening track".to_string()),
            year: 2025,
        })
        .unwrap();

    let kept = cohorts
        .update(
            cohort.id,
            CohortPatch {
                year: Some(2026),
                ..CohortPatch::default()
            },
        )
        .unwrap();
    assert_eq!(kept.description.as_deref(), Some("evening track"));

    let cleared = cohorts
        .update(
            cohort.id,
            CohortPatch {
                description: Some(None),
                ..CohortPatch::default()
            },
        )
        .unwrap();
    assert_eq!(cleared.description, None);
    assert_eq!(cohorts.find_one(cohort.id).unwrap().cohort.description, None);
}

#[test]
fn remove_detaches_memberships_but_keeps_members() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let members = member_service(&conn);
    let doomed = cohorts.create(new_cohort("Promo25", 2025)).unwrap();
    let kept = cohorts.create(new_cohort("Promo26", 2026)).unwrap();
    let member = members
        .create(new_member("S1", "Arendt", vec![doomed.id, kept.id]))
        .unwrap();

    cohorts.remove(doomed.id).unwrap();

    let reloaded = members.find_one(member.member.id).unwrap();
    assert_eq!(reloaded.cohort_ids.into_iter().collect::<Vec<_>>(), vec![kept.id]);
    assert_eq!(members.count().unwrap(), 1);
    assert!(matches!(
        cohorts.find_one(doomed.id).unwrap_err(),
        RegistryError::NotFound(NotFoundError::Cohort(id)) if id == doomed.id
    ));
}

#[test]
fn missing_cohort_yields_not_found() {
    let conn = open_db_in_memory().unwrap();
    let cohorts = cohort_service(&conn);
    let id = Uuid::new_v4();

    for err in [
        cohorts.find_one(id).unwrap_err(),
        cohorts.update(id, CohortPatch::default()).unwrap_err(),
        cohorts.remove(id).unwrap_err(),
    ] {
        assert!(matches!(
            err,
            RegistryError::NotFound(NotFoundError::Cohort(missing)) if missing == id
        ));
    }
}
