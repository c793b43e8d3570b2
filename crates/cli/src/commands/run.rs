use cloudlift_core::directory::DirectoryClient;
use cloudlift_graph::sync::MigrationEngine;

use super::{analyze, migrate, report, Context, Verdict};

/// Run the `run` command: analyze, migrate and report in one pass.
pub async fn run(
    config_path: &str,
    env_name: &str,
    dry_run: bool,
    export_passwords: bool,
) -> anyhow::Result<Verdict> {
    let ctx = Context::load(config_path, env_name)?;
    let engine = ctx.engine(ctx.connect()?, dry_run);
    pipeline(&ctx, &engine, export_passwords).await
}

pub async fn pipeline<D: DirectoryClient>(
    ctx: &Context,
    engine: &MigrationEngine<D>,
    export_passwords: bool,
) -> anyhow::Result<Verdict> {
    println!(
        "Environment: {} ({})",
        ctx.env.environment, ctx.env.description
    );
    println!();

    let plan = analyze::analyze(ctx, engine).await?;
    println!();
    let verdict = migrate::migrate(ctx, engine, &plan, export_passwords).await?;

    if !engine.options().dry_run {
        println!();
        println!("{}", report::render(ctx)?);
    }

    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testutil::{write_config, SOURCE_JSON};
    use cloudlift_core::models::report::MigrationReport;
    use cloudlift_core::report::read_json;
    use cloudlift_graph::auth::GraphAuth;
    use cloudlift_graph::client::GraphClient;
    use wiremock::matchers::{body_partial_json, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GraphClient {
        GraphClient::new(GraphAuth::Static("t".into()))
            .unwrap()
            .with_base_url(&server.uri())
    }

    async fn mount_empty_directory(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": []})))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/users/.+"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": "Request_ResourceNotFound", "message": "not found"}
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": []})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn run_requires_config_file() {
        let result = run("/nonexistent/cloudlift.toml", "dev", false, false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn full_pipeline_in_dev() {
        let server = MockServer::start().await;
        mount_empty_directory(&server).await;

        for (upn, id) in [
            ("jean.dupont@example.com", "u-1"),
            ("anna.smith@example.com", "u-2"),
        ] {
            Mock::given(method("POST"))
                .and(path("/users"))
                .and(body_partial_json(serde_json::json!({"userPrincipalName": upn})))
                .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                    "id": id,
                    "userPrincipalName": upn
                })))
                .expect(1)
                .mount(&server)
                .await;
        }
        for (name, id) in [("DEV-GRP-IT", "g-1"), ("DEV-GRP-RH", "g-2")] {
            Mock::given(method("POST"))
                .and(path("/groups"))
                .and(body_partial_json(serde_json::json!({"displayName": name})))
                .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                    "id": id,
                    "displayName": name
                })))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path_regex("^/groups/.+/members/\\$ref$"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path(), &server.uri(), SOURCE_JSON);
        let ctx = Context::load(&config_path, "dev").unwrap();
        let engine = ctx.engine(client(&server), false);

        let verdict = pipeline(&ctx, &engine, false).await.unwrap();
        assert_eq!(verdict, Verdict::success());

        let paths = ctx.artifacts();
        let report: MigrationReport = read_json(&paths.report).unwrap();
        assert_eq!(report.migrated.len(), 2);
        assert!(report.failed.is_empty());
        let text = std::fs::read_to_string(&paths.text).unwrap();
        assert!(text.contains("* Jean Dupont (IT) -> jean.dupont@example.com"));
    }

    #[tokio::test]
    async fn production_failures_are_fatal() {
        let server = MockServer::start().await;
        mount_empty_directory(&server).await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {
                    "code": "Authorization_RequestDenied",
                    "message": "Insufficient privileges to complete the operation."
                }
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path(), &server.uri(), SOURCE_JSON);

        let prod = Context::load(&config_path, "prod").unwrap();
        let verdict = pipeline(&prod, &prod.engine(client(&server), false), false)
            .await
            .unwrap();
        assert_eq!(verdict.failed, 2);
        assert!(verdict.fatal);

        let dev = Context::load(&config_path, "dev").unwrap();
        let verdict = pipeline(&dev, &dev.engine(client(&server), false), false)
            .await
            .unwrap();
        assert_eq!(verdict.failed, 2);
        assert!(!verdict.fatal);
    }

    #[tokio::test]
    async fn dry_run_creates_nothing() {
        let server = MockServer::start().await;
        mount_empty_directory(&server).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path(), &server.uri(), SOURCE_JSON);
        let ctx = Context::load(&config_path, "dev").unwrap();

        let verdict = pipeline(&ctx, &ctx.engine(client(&server), true), false)
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::success());
        assert!(!ctx.artifacts().report.exists());
    }
}
