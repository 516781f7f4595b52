use chrono::Duration;
use theory_core::model::{
    BonusTier, Category, ChoiceIndex, LearningModule, MasteryAward, ModuleId, ModuleProgress,
    ModuleStatus, ProgressRecord, Question, QuestionId, QuizScore, QuizSession, SessionId, UserId,
};
use theory_core::time::fixed_now;
use storage::repository::{
    AttemptRecord, AttemptRepository, ModuleRepository, ProgressRepository, QuestionRepository,
    SessionRepository, StorageError,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_question(id: u64, category: Category) -> Question {
    Question::new(
        QuestionId::new(id),
        category,
        format!("Prompt {id}"),
        vec![
            "First".to_string(),
            "Second".to_string(),
            "Third".to_string(),
        ],
        ChoiceIndex::new(1),
        Some("Because the second answer is right.".to_string()),
    )
    .unwrap()
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn question_roundtrip_preserves_request_order() {
    let repo = connect("memdb_questions").await;

    repo.upsert_question(&build_question(1, Category::Alertness))
        .await
        .unwrap();
    repo.upsert_question(&build_question(2, Category::RoadSigns))
        .await
        .unwrap();
    repo.upsert_question(&build_question(3, Category::RoadSigns))
        .await
        .unwrap();

    let fetched = repo
        .get_questions(&[QuestionId::new(3), QuestionId::new(1)])
        .await
        .unwrap();
    assert_eq!(fetched.len(), 2);
    assert_eq!(fetched[0].id(), QuestionId::new(3));
    assert_eq!(fetched[1].id(), QuestionId::new(1));
    assert_eq!(fetched[1].choices().len(), 3);
    assert!(fetched[1].is_correct(ChoiceIndex::new(1)));
    assert_eq!(
        fetched[1].explanation(),
        Some("Because the second answer is right.")
    );

    let reversed = repo
        .get_questions(&[QuestionId::new(3), QuestionId::new(2), QuestionId::new(1)])
        .await
        .unwrap();
    assert_eq!(
        reversed.iter().map(Question::id).collect::<Vec<_>>(),
        vec![QuestionId::new(3), QuestionId::new(2), QuestionId::new(1)]
    );

    let missing = repo.get_questions(&[QuestionId::new(9)]).await;
    assert!(matches!(missing, Err(StorageError::NotFound)));

    // A batch with one unknown id fails as a whole.
    let partial = repo
        .get_questions(&[QuestionId::new(1), QuestionId::new(9)])
        .await;
    assert!(matches!(partial, Err(StorageError::NotFound)));

    let signs = repo.list_by_category(Category::RoadSigns, 10).await.unwrap();
    assert_eq!(signs.len(), 2);
    assert_eq!(signs[0].id(), QuestionId::new(2));

    let all = repo.list_questions(2).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id(), QuestionId::new(1));
}

#[tokio::test]
async fn session_upsert_overwrites_and_resume_finds_latest() {
    let repo = connect("memdb_sessions").await;
    let user = UserId::new("learner-1").unwrap();

    let mut session = QuizSession::new(
        vec![QuestionId::new(1), QuestionId::new(2)],
        fixed_now(),
    )
    .unwrap();
    session.start(fixed_now());
    repo.upsert_session(Some(&user), &session.snapshot())
        .await
        .unwrap();

    session
        .record_answer(QuestionId::new(1), ChoiceIndex::new(0), fixed_now())
        .unwrap();
    session.advance(fixed_now()).unwrap();
    repo.upsert_session(Some(&user), &session.snapshot())
        .await
        .unwrap();

    let stored = repo.get_session(session.id()).await.unwrap().unwrap();
    assert_eq!(stored, session.snapshot());
    assert_eq!(stored.answers.len(), 1);
    assert_eq!(stored.cursor, 1);

    let mut older = QuizSession::new(
        vec![QuestionId::new(5)],
        fixed_now() - Duration::hours(1),
    )
    .unwrap();
    older.start(fixed_now() - Duration::hours(1));
    repo.upsert_session(None, &older.snapshot()).await.unwrap();

    let resumed = repo.latest_in_progress().await.unwrap().unwrap();
    assert_eq!(resumed.session_id, session.id());
}

#[tokio::test]
async fn completed_sessions_are_not_resumable() {
    let repo = connect("memdb_completed").await;

    let mut session = QuizSession::new(vec![QuestionId::new(1)], fixed_now()).unwrap();
    session.start(fixed_now());
    session
        .record_answer(QuestionId::new(1), ChoiceIndex::new(0), fixed_now())
        .unwrap();
    session.complete(fixed_now() + Duration::minutes(5)).unwrap();
    repo.upsert_session(None, &session.snapshot()).await.unwrap();

    assert!(repo.latest_in_progress().await.unwrap().is_none());

    let stored = repo.get_session(session.id()).await.unwrap().unwrap();
    assert_eq!(stored.completed_at, session.snapshot().completed_at);
}

#[tokio::test]
async fn attempts_append_and_list_newest_first() {
    let repo = connect("memdb_attempts").await;

    let mut ids = Vec::new();
    for offset in 0..3 {
        let score = QuizScore::new(43, 50).unwrap();
        let attempt = AttemptRecord {
            id: None,
            session_id: SessionId::generate(),
            user_id: Some(UserId::new("learner-1").unwrap()),
            correct: score.correct(),
            total: score.total(),
            percent: score.percent(),
            tier: BonusTier::Pass,
            points_awarded: 455,
            started_at: fixed_now(),
            completed_at: fixed_now() + Duration::minutes(offset),
        };
        ids.push(repo.append_attempt(&attempt).await.unwrap());
    }
    assert_eq!(ids.len(), 3);
    assert!(ids[0] < ids[1]);

    let recent = repo.list_recent(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].completed_at, fixed_now() + Duration::minutes(2));
    assert_eq!(recent[0].id, Some(ids[2]));
    assert_eq!(recent[0].tier, BonusTier::Pass);
    assert_eq!(recent[0].percent, 86);
}

#[tokio::test]
async fn progress_row_is_overwritten_in_place() {
    let repo = connect("memdb_progress").await;
    assert!(repo.load_progress().await.unwrap().is_none());

    let first = ProgressRecord::new(fixed_now());
    repo.save_progress(&first).await.unwrap();

    let mut second = ProgressRecord::new(fixed_now());
    second.record_module_mastery(
        MasteryAward::for_module_mastery(),
        fixed_now() + Duration::minutes(1),
    );
    repo.save_progress(&second).await.unwrap();

    let loaded = repo.load_progress().await.unwrap().unwrap();
    assert_eq!(loaded, second);
    assert_eq!(loaded.modules_mastered(), 1);
}

#[tokio::test]
async fn module_definitions_and_status_roundtrip() {
    let repo = connect("memdb_modules").await;

    let module = LearningModule::new(
        ModuleId::new(1),
        Category::HazardAwareness,
        "Reading the road",
        "Spotting developing hazards early.",
    )
    .unwrap();
    repo.upsert_module(&module).await.unwrap();

    let fetched = repo.get_module(module.id()).await.unwrap().unwrap();
    assert_eq!(fetched.title(), "Reading the road");
    assert_eq!(fetched.category(), Category::HazardAwareness);
    assert!(repo.get_module(ModuleId::new(99)).await.unwrap().is_none());

    let mut progress = ModuleProgress::new(module.id(), fixed_now());
    assert!(progress.promote(ModuleStatus::Studied, fixed_now()));
    repo.save_module_progress(&progress).await.unwrap();

    assert!(progress.promote(
        ModuleStatus::Mastered,
        fixed_now() + Duration::minutes(1)
    ));
    repo.save_module_progress(&progress).await.unwrap();

    let stored = repo.get_module_progress(module.id()).await.unwrap().unwrap();
    assert_eq!(stored.status(), ModuleStatus::Mastered);
    assert_eq!(stored.updated_at(), fixed_now() + Duration::minutes(1));
    assert_eq!(repo.list_module_progress().await.unwrap().len(), 1);
}
