//! Firestore integration tests.
//!
//! These exercise the live REST client and repositories, so they only run
//! with service-account credentials configured.

use jobport_firestore::{
    ApplicationRepository, EmployerRepository, FirestoreClient, JobRepository, UserRepository,
};
use jobport_models::{
    EmployerProfile, JobApplication, JobCategory, JobId, JobPosting, JobType, Role, UserAccount,
};

async fn client() -> FirestoreClient {
    dotenvy::dotenv().ok();
    FirestoreClient::from_env()
        .await
        .expect("Failed to create Firestore client")
}

/// Test Firestore connection.
#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn test_firestore_connection() {
    let client = client().await;

    // The probe document need not exist; reachability is what matters.
    let result = client.get_document("_health", "_check").await;
    assert!(result.is_ok());
}

/// Test user repository CRUD and email lookup.
#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn test_user_repository_crud() {
    let repo = UserRepository::new(client().await);

    let email = format!("it-{}@example.com", uuid::Uuid::new_v4());
    let user = UserAccount::new("Integration Test", &email, "555-0100", "$argon2id$x", Role::Candidate);

    repo.create(&user).await.expect("create user");

    let fetched = repo.get(&user.id).await.expect("get user").expect("user exists");
    assert_eq!(fetched.email, email);
    assert_eq!(fetched.role, Role::Candidate);

    let by_email = repo
        .find_by_email(&email)
        .await
        .expect("query user")
        .expect("found by email");
    assert_eq!(by_email.id, user.id);

    repo.set_active(&user.id, false).await.expect("suspend");
    let suspended = repo.get(&user.id).await.unwrap().unwrap();
    assert!(!suspended.is_active);

    repo.delete(&user.id).await.expect("delete user");
    assert!(repo.get(&user.id).await.unwrap().is_none());
}

/// Counter updates must survive concurrent writers without losing
/// increments.
#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn test_job_view_counter_is_atomic() {
    let client = client().await;
    let employers = EmployerRepository::new(client.clone());
    let jobs = JobRepository::new(client.clone());

    let employer = EmployerProfile::new(
        "Counter Test Co",
        format!("it-{}@example.com", uuid::Uuid::new_v4()),
        "$argon2id$x",
        "555-0100",
    );
    employers.create(&employer).await.expect("create employer");

    let now = chrono::Utc::now();
    let job = JobPosting {
        id: JobId::new(),
        title: "Counter Test".to_string(),
        description: "Counts views".to_string(),
        company: "Counter Test Co".to_string(),
        category: JobCategory::Technology,
        job_type: JobType::Remote,
        location: "Remote".to_string(),
        salary: None,
        experience: None,
        education: None,
        requirements: vec![],
        responsibilities: vec![],
        tags: vec![],
        deadline: now + chrono::Duration::days(7),
        employer_id: employer.id.clone(),
        views: 0,
        application_count: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    jobs.create(&job).await.expect("create job");

    // Ten concurrent view increments, no lost updates.
    let mut handles = Vec::new();
    for _ in 0..10 {
        let jobs = JobRepository::new(client.clone());
        let id = job.id.clone();
        handles.push(tokio::spawn(async move { jobs.increment_views(&id).await }));
    }
    for handle in handles {
        handle.await.unwrap().expect("increment views");
    }

    let fetched = jobs.get(&job.id).await.unwrap().unwrap();
    assert_eq!(fetched.views, 10);

    // Decrement floors at zero.
    jobs.adjust_application_count(&job.id, -3).await.expect("adjust");
    let fetched = jobs.get(&job.id).await.unwrap().unwrap();
    assert_eq!(fetched.application_count, 0);

    jobs.delete(&job.id).await.expect("delete job");
    employers.delete(&employer.id).await.expect("delete employer");
}

/// A second application for the same (candidate, job) pair must conflict.
#[tokio::test]
#[ignore = "requires Firestore credentials"]
async fn test_duplicate_application_conflicts() {
    let client = client().await;
    let applications = ApplicationRepository::new(client);

    let application = JobApplication::new(
        JobId::from(format!("it-job-{}", uuid::Uuid::new_v4())),
        jobport_models::UserId::new(),
        jobport_models::EmployerId::new(),
        "resumes/it/cv.pdf",
        None,
    );

    applications.create(&application).await.expect("first create");

    let duplicate = applications.create(&application).await;
    assert!(matches!(
        duplicate,
        Err(jobport_firestore::FirestoreError::AlreadyExists(_))
    ));

    applications.delete(&application.id).await.expect("cleanup");
}
