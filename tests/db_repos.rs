use scriba::application::pagination::PageRequest;
use scriba::application::repos::{
    BloggersRepo, CreatePostParams, PostListScope, PostQueryFilter, PostsRepo, PostsWriteRepo,
    RepoError, TagsRepo, UpdatePostParams,
};
use scriba::domain::entities::{BloggerRecord, PostRecord};
use scriba::domain::posts::MonthKey;
use scriba::domain::types::StateCatalog;
use scriba::infra::db::PostgresRepositories;
use sqlx::PgPool;
use time::{OffsetDateTime, macros::datetime};

async fn blogger(repos: &PostgresRepositories) -> BloggerRecord {
    repos
        .create_blogger("ada", Some("Ada Lovelace"), None)
        .await
        .expect("create blogger")
}

async fn post(
    repos: &PostgresRepositories,
    author: &BloggerRecord,
    title: &str,
    state: &str,
    published_at: OffsetDateTime,
    tags: &[&str],
) -> PostRecord {
    repos
        .create_post(CreatePostParams {
            title: title.to_string(),
            body: "A body long enough to pass.".to_string(),
            footnotes: None,
            state: state.to_string(),
            published_at,
            blogger: author.blogger_ref(),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
        })
        .await
        .expect("create post")
}

fn sorted(mut tags: Vec<String>) -> Vec<String> {
    tags.sort();
    tags
}

#[sqlx::test(migrations = "./migrations")]
async fn create_and_update_replace_taggings(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = blogger(&repos).await;
    let created = post(
        &repos,
        &author,
        "Tagged database post",
        "published",
        datetime!(2024-01-15 10:00 UTC),
        &["rust", "web"],
    )
    .await;
    assert_eq!(sorted(created.tags.clone()), vec!["rust", "web"]);
    assert_eq!(created.blogger, author.blogger_ref());

    let updated = repos
        .update_post(UpdatePostParams {
            id: created.id,
            title: created.title.clone(),
            body: created.body.clone(),
            footnotes: Some("A footnote".to_string()),
            state: "draft".to_string(),
            published_at: created.published_at,
            tags: vec!["web".to_string(), "sql".to_string()],
        })
        .await
        .expect("update post");
    assert_eq!(sorted(updated.tags), vec!["sql", "web"]);
    assert_eq!(updated.footnotes.as_deref(), Some("A footnote"));
    assert_eq!(updated.state, "draft");

    let tags = repos.list_used_tags().await.expect("tags");
    let names: Vec<_> = tags.iter().map(|tag| tag.name.as_str()).collect();
    assert!(!names.contains(&"rust"));
    assert!(names.contains(&"sql"));
}

#[sqlx::test(migrations = "./migrations")]
async fn listing_orders_scopes_and_filters(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = blogger(&repos).await;
    post(&repos, &author, "Oldest public post", "published", datetime!(2024-01-15 10:00 UTC), &["rust"]).await;
    post(&repos, &author, "Newest public post", "published", datetime!(2024-02-10 09:30 UTC), &["web"]).await;
    post(&repos, &author, "Hidden draft post", "draft", datetime!(2024-03-05 18:45 UTC), &["rust"]).await;

    let public = PostListScope::active(&StateCatalog::default());
    let all = repos
        .list_posts(&public, &PostQueryFilter::default(), None)
        .await
        .expect("list");
    let titles: Vec<_> = all.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Newest public post", "Oldest public post"]);

    let first_page = repos
        .list_posts(&PostListScope::All, &PostQueryFilter::default(), Some(PageRequest::new(1, 2)))
        .await
        .expect("page");
    assert_eq!(first_page.len(), 2);
    assert_eq!(first_page[0].title, "Hidden draft post");

    let tagged = repos
        .count_posts(&public, &PostQueryFilter::tagged("rust"))
        .await
        .expect("count tagged");
    assert_eq!(tagged, 1);

    let mixed_case = repos
        .count_posts(&public, &PostQueryFilter::tagged("Rust"))
        .await
        .expect("count mixed case");
    assert_eq!(mixed_case, 1);

    let month = MonthKey::new(2024, 2).expect("month");
    let in_february = repos
        .list_posts(&PostListScope::All, &PostQueryFilter::in_month(month), None)
        .await
        .expect("month filter");
    assert_eq!(in_february.len(), 1);
    assert_eq!(in_february[0].title, "Newest public post");
}

#[sqlx::test(migrations = "./migrations")]
async fn month_counts_are_newest_first(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let author = blogger(&repos).await;
    post(&repos, &author, "January post one", "published", datetime!(2024-01-02 10:00 UTC), &[]).await;
    post(&repos, &author, "January post two", "published", datetime!(2024-01-30 10:00 UTC), &[]).await;
    post(&repos, &author, "March post here", "published", datetime!(2024-03-01 00:00 UTC), &[]).await;
    post(&repos, &author, "March draft here", "draft", datetime!(2024-03-02 00:00 UTC), &[]).await;

    let counts = repos
        .list_month_counts(&PostListScope::active(&StateCatalog::default()))
        .await
        .expect("month counts");
    let summary: Vec<_> = counts
        .iter()
        .map(|count| (count.label.as_str(), count.count))
        .collect();
    assert_eq!(summary, vec![("March 2024", 1), ("January 2024", 2)]);
}

#[sqlx::test(migrations = "./migrations")]
async fn missing_rows_surface_as_not_found(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);

    assert!(repos.find_post(4242).await.expect("find").is_none());
    assert!(matches!(
        repos.delete_post(4242).await,
        Err(RepoError::NotFound)
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_usernames_are_rejected(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    blogger(&repos).await;

    let err = repos
        .create_blogger("ada", None, None)
        .await
        .expect_err("duplicate username");
    assert!(matches!(err, RepoError::Duplicate { .. }));
}
