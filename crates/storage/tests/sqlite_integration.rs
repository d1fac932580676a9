use chrono::Duration;
use quiz_core::model::{AnswerKey, Question, QuestionId, QuestionKind, SelectedAnswer};
use quiz_core::time::fixed_now;
use storage::repository::{CategoryFilter, QuestionRepository, SessionRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn build_question(id: u64, category: &str) -> Question {
    Question::new(
        QuestionId::new(id),
        format!("Q{id}"),
        vec!["a".into(), "b".into(), "c".into(), "d".into()],
        AnswerKey::Single(1),
        QuestionKind::MultipleChoice,
        category,
    )
    .unwrap()
}

fn build_multi_question(id: u64, category: &str) -> Question {
    Question::new(
        QuestionId::new(id),
        format!("Q{id}"),
        vec!["a".into(), "b".into(), "c".into(), "d".into()],
        AnswerKey::multiple([0, 2]),
        QuestionKind::MultiSelect,
        category,
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_keys_and_kinds() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_questions?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let single = build_question(1, "History");
    let multi = build_multi_question(2, "Law");
    repo.upsert_question(&single).await.unwrap();
    repo.upsert_question(&multi).await.unwrap();

    let all = repo.load_questions(&CategoryFilter::All).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0], single);
    assert_eq!(all[1], multi);

    let law = repo
        .load_questions(&CategoryFilter::named("Law"))
        .await
        .unwrap();
    assert_eq!(law.len(), 1);
    assert_eq!(law[0].key(), &AnswerKey::multiple([0, 2]));
    assert_eq!(law[0].kind(), QuestionKind::MultiSelect);

    assert_eq!(
        repo.list_categories().await.unwrap(),
        vec!["History".to_owned(), "Law".to_owned()]
    );
}

#[tokio::test]
async fn sqlite_distinguishes_unknown_from_empty_category() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_categories?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.upsert_question(&build_question(1, "History"))
        .await
        .unwrap();
    repo.register_category("Ethics").await.unwrap();

    let err = repo
        .load_questions(&CategoryFilter::named("Astronomy"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let empty = repo
        .load_questions(&CategoryFilter::named("Ethics"))
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn sqlite_upsert_replaces_by_id() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_upsert?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.upsert_question(&build_question(1, "History"))
        .await
        .unwrap();
    repo.upsert_question(&build_multi_question(1, "Law"))
        .await
        .unwrap();

    let all = repo.load_questions(&CategoryFilter::All).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].category(), "Law");
    assert_eq!(all[0].kind(), QuestionKind::MultiSelect);
}

#[tokio::test]
async fn sqlite_session_lifecycle_round_trips() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_sessions?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let now = fixed_now();
    let id = repo.create_session(3, now).await.unwrap();

    let open = repo.get_session(id).await.unwrap();
    assert!(!open.is_completed());
    assert_eq!(open.total_questions(), 3);
    assert_eq!(open.ended_at(), None);
    assert!(open.answers().iter().all(Option::is_none));

    let answers = vec![
        Some(SelectedAnswer::Single(1)),
        None,
        Some(SelectedAnswer::multiple([2, 0])),
    ];
    repo.complete_session(id, now + Duration::minutes(3), 1, &answers)
        .await
        .unwrap();

    let done = repo.get_session(id).await.unwrap();
    assert!(done.is_completed());
    assert_eq!(done.score(), 1);
    assert_eq!(done.ended_at(), Some(now + Duration::minutes(3)));
    assert_eq!(done.answers(), answers.as_slice());
}

#[tokio::test]
async fn sqlite_completing_a_missing_session_is_not_found() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_missing?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let err = repo
        .complete_session(99, fixed_now(), 0, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_lists_sessions_most_recent_first() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_listing?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let now = fixed_now();
    let older = repo.create_session(1, now).await.unwrap();
    let newer = repo
        .create_session(1, now + Duration::hours(1))
        .await
        .unwrap();

    let rows = repo.list_sessions(10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, newer);
    assert_eq!(rows[1].id, older);

    let limited = repo.list_sessions(1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, newer);
}
