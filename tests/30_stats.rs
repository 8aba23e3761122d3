mod common;

use std::sync::Arc;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use battle_stats_api::config::PartialFailurePolicy;
use battle_stats_api::database::MemoryBattleStore;

use common::{FailingStore, TestServer, USER};

async fn stats(server: &TestServer) -> Result<(StatusCode, String)> {
    let res = server.get_authed("/api/stats").await?;
    let status = res.status();
    Ok((status, res.text().await?))
}

async fn server_over(battles: &str) -> Result<TestServer> {
    let store = MemoryBattleStore::from_json(battles, vec![])?.with_user(USER);
    TestServer::start(Arc::new(store), PartialFailurePolicy::Reject).await
}

#[tokio::test]
async fn summarizes_the_fixture() -> Result<()> {
    let server = TestServer::with_fixture().await?;

    let (status, body) = stats(&server).await?;
    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_str(&body)?;

    assert_eq!(
        summary,
        json!({
            "most_active": {
                "attacker_king": "Joffrey",
                "defender_king": "Robb Stark",
                "region": "The Riverlands",
                "name": "Battle at the Mummer's Ford"
            },
            "attacker_outcome": { "win": 6, "loss": 1 },
            "battle_type": ["ambush", "pitched battle", "siege"],
            "defender_size": { "average": 8024.0, "min": 120, "max": 20000 }
        })
    );
    Ok(())
}

#[tokio::test]
async fn field_order_is_fixed() -> Result<()> {
    let server = TestServer::with_fixture().await?;

    let (_, body) = stats(&server).await?;
    let positions: Vec<usize> = ["\"most_active\"", "\"attacker_outcome\"", "\"battle_type\"", "\"defender_size\""]
        .iter()
        .map(|key| body.find(key).expect("key present"))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", body);
    Ok(())
}

#[tokio::test]
async fn two_record_scenario() -> Result<()> {
    let server = server_over(
        r#"[
          {"attacker_king": "A", "defender_king": "B", "attacker_outcome": "win",
           "region": "North", "battle_type": "siege", "defender_size": 5000},
          {"attacker_king": "A", "defender_king": "C", "attacker_outcome": "loss",
           "region": "North", "battle_type": "", "defender_size": ""}
        ]"#,
    )
    .await?;

    let (status, body) = stats(&server).await?;
    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_str(&body)?;

    assert_eq!(summary["most_active"]["region"], "North");
    assert_eq!(summary["most_active"]["attacker_king"], "A");
    assert_eq!(summary["attacker_outcome"], json!({ "win": 1, "loss": 1 }));
    assert_eq!(summary["battle_type"], json!(["siege"]));
    assert_eq!(summary["defender_size"], json!({ "average": 5000.0, "min": 5000, "max": 5000 }));
    Ok(())
}

#[tokio::test]
async fn outcome_counters_ignore_other_values() -> Result<()> {
    let server = server_over(
        r#"[
          {"attacker_outcome": "win"}, {"attacker_outcome": "win"},
          {"attacker_outcome": "loss"}, {"attacker_outcome": "draw"},
          {"attacker_outcome": ""}, {"attacker_outcome": null}, {}
        ]"#,
    )
    .await?;

    let (_, body) = stats(&server).await?;
    let summary: Value = serde_json::from_str(&body)?;
    assert_eq!(summary["attacker_outcome"], json!({ "win": 2, "loss": 1 }));
    Ok(())
}

#[tokio::test]
async fn defender_size_sentinel_without_sizes() -> Result<()> {
    let server = server_over(r#"[{"name": "Skirmish", "defender_size": ""}, {"name": "Raid"}]"#).await?;

    let (status, body) = stats(&server).await?;
    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_str(&body)?;
    assert_eq!(summary["defender_size"], json!({ "average": "", "min": "", "max": "" }));
    assert_eq!(summary["battle_type"], json!([]));
    assert_eq!(summary["most_active"]["attacker_king"], "");
    assert_eq!(summary["most_active"]["name"], "Raid");
    Ok(())
}

#[tokio::test]
async fn defender_size_bounds_hold() -> Result<()> {
    let server = TestServer::with_fixture().await?;

    let (_, body) = stats(&server).await?;
    let summary: Value = serde_json::from_str(&body)?;
    let size = &summary["defender_size"];
    let (min, avg, max) = (
        size["min"].as_f64().expect("numeric min"),
        size["average"].as_f64().expect("numeric average"),
        size["max"].as_f64().expect("numeric max"),
    );
    assert!(min <= avg && avg <= max, "{} {} {}", min, avg, max);
    Ok(())
}

#[tokio::test]
async fn repeated_stats_are_byte_identical() -> Result<()> {
    let server = TestServer::with_fixture().await?;

    let (_, first) = stats(&server).await?;
    for _ in 0..3 {
        let (_, again) = stats(&server).await?;
        assert_eq!(first, again);
    }
    Ok(())
}

#[tokio::test]
async fn reject_policy_reports_failed_sub_queries() -> Result<()> {
    let store = FailingStore::new(common::fixture_store(), &["region", "defender_size"]);
    let server = TestServer::start(Arc::new(store), PartialFailurePolicy::Reject).await?;

    let (status, body) = stats(&server).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: Value = serde_json::from_str(&body)?;
    assert_eq!(error["error"], true);
    assert_eq!(error["code"], "PARTIAL_AGGREGATION_FAILURE");
    assert_eq!(error["failed"], json!(["region", "defender_size"]));
    assert!(error["message"].as_str().unwrap_or_default().contains("simulated failure"));
    Ok(())
}

#[tokio::test]
async fn degrade_policy_fills_defaults() -> Result<()> {
    let store = FailingStore::new(common::fixture_store(), &["region", "defender_size"]);
    let server = TestServer::start(Arc::new(store), PartialFailurePolicy::Degrade).await?;

    let (status, body) = stats(&server).await?;
    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_str(&body)?;
    assert_eq!(summary["most_active"]["region"], "");
    assert_eq!(summary["most_active"]["attacker_king"], "Joffrey");
    assert_eq!(summary["defender_size"], json!({ "average": "", "min": "", "max": "" }));
    assert_eq!(summary["attacker_outcome"], json!({ "win": 6, "loss": 1 }));
    Ok(())
}
