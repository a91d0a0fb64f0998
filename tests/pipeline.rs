//! End-to-end runs of the portal pipeline against in-memory collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use portal_notifier::error::{AppError, Result};
use portal_notifier::models::{Alert, BlackboardResponse, Config};
use portal_notifier::pipeline::PortalPipeline;
use portal_notifier::services::{CollectingAlertSink, DetailSource, HttpDetailFetcher};
use portal_notifier::utils::clock::FixedClock;
use portal_notifier::utils::http::create_async_client;
use portal_notifier::utils::text::normalize;

const PHRASE: &str = "Ihre Videokonferenz startet in Kuerze um";

/// Detail pages served from memory.
#[derive(Default)]
struct MemoryDetails {
    bodies: HashMap<String, String>,
    links: HashMap<String, Vec<String>>,
}

#[async_trait]
impl DetailSource for MemoryDetails {
    async fn fetch_body(&self, link: &str) -> String {
        self.bodies.get(link).cloned().unwrap_or_default()
    }

    async fn fetch_links(&self, link: &str) -> Result<Vec<String>> {
        self.links
            .get(link)
            .cloned()
            .ok_or_else(|| AppError::fetch(link, "unexpected status 404 Not Found"))
    }

    fn resolve(&self, link: &str) -> String {
        format!("https://portal.example{link}")
    }
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(7, 50, 0)
            .unwrap(),
    ))
}

fn notification_table(rows: &[(&str, &str, &str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(date, time, text, link)| {
            format!(
                "<tr><td>Kurs</td><td>Info</td><td>{date}</td><td>{time}</td><td>Neu</td>\
                 <td><a href=\"{link}\">{text}</a></td></tr>"
            )
        })
        .collect();
    format!("<table><tr><th>Kurs</th></tr>{body}</table>")
}

fn pipeline(details: MemoryDetails) -> (PortalPipeline, Arc<CollectingAlertSink>) {
    let sink = Arc::new(CollectingAlertSink::new());
    let pipeline =
        PortalPipeline::new(&Config::default(), Arc::new(details), sink.clone(), clock()).unwrap();
    (pipeline, sink)
}

#[tokio::test]
async fn scenario_a_admits_alert_in_morning_window() {
    let mut details = MemoryDetails::default();
    details
        .links
        .insert("/x".to_string(), vec!["https://meet.example/room/1".to_string()]);
    let (pipeline, sink) = pipeline(details);

    let text = format!("{PHRASE} 08:00 Uhr");
    let html = notification_table(&[("03.02.2026", "'08:00:00'", &text, "/x")]);
    let outcome = pipeline.process_notifications(&html).await.unwrap();

    assert_eq!(outcome.admitted.len(), 1);
    assert_eq!(outcome.admitted[0].subject, text);
    assert_eq!(outcome.admitted[0].link, "/x");
    assert_eq!(
        sink.alerts(),
        vec![Alert {
            link: "https://meet.example/room/1".to_string(),
            text: text[1..].to_string(),
        }]
    );
}

#[tokio::test]
async fn scenario_b_rejects_alert_outside_windows() {
    let (pipeline, sink) = pipeline(MemoryDetails::default());

    let text = format!("{PHRASE} 09:00 Uhr");
    let html = notification_table(&[("03.02.2026", "'09:00:00'", &text, "/x")]);
    let outcome = pipeline.process_notifications(&html).await.unwrap();

    assert!(outcome.admitted.is_empty());
    assert_eq!(outcome.rows_today, 1);
    assert!(sink.alerts().is_empty());
    assert!(pipeline.dedup().is_empty());
}

#[tokio::test]
async fn rows_from_other_days_are_ignored() {
    let (pipeline, sink) = pipeline(MemoryDetails::default());

    let text = format!("{PHRASE} 08:00 Uhr");
    let html = notification_table(&[("03.01.2026", "not a time", &text, "/x")]);
    let outcome = pipeline.process_notifications(&html).await.unwrap();

    assert_eq!(outcome.rows_today, 0);
    assert_eq!(outcome.time_parse_failures, 0);
    assert!(sink.alerts().is_empty());
}

#[tokio::test]
async fn unreadable_time_does_not_stop_the_scan() {
    let mut details = MemoryDetails::default();
    details
        .links
        .insert("/b".to_string(), vec!["https://meet.example/b".to_string()]);
    let (pipeline, sink) = pipeline(details);

    let first = format!("{PHRASE} 08:00 Uhr (A)");
    let second = format!("{PHRASE} 12:00 Uhr (B)");
    let html = notification_table(&[
        ("03.02.2026", "acht Uhr", &first, "/a"),
        ("03.02.2026", "12:00:00", &second, "/b"),
    ]);
    let outcome = pipeline.process_notifications(&html).await.unwrap();

    assert_eq!(outcome.time_parse_failures, 1);
    assert_eq!(outcome.admitted.len(), 1);
    assert_eq!(sink.alerts().len(), 1);
}

#[tokio::test]
async fn scanning_the_same_snapshot_twice_delivers_once() {
    let (pipeline, sink) = pipeline(MemoryDetails::default());

    let text = format!("{PHRASE} 11:45 Uhr");
    let html = notification_table(&[
        ("03.02.2026", "11:45:00", &text, "/y"),
        ("03.02.2026", "11:45:00", &text, "/y"),
    ]);

    let first = pipeline.process_notifications(&html).await.unwrap();
    assert_eq!(first.admitted.len(), 1);
    assert_eq!(first.suppressed, 1);

    let second = pipeline.process_notifications(&html).await.unwrap();
    assert!(second.admitted.is_empty());
    assert_eq!(second.suppressed, 2);

    // No conference link could be resolved, so the detail page is sent.
    assert_eq!(
        sink.alerts(),
        vec![Alert {
            link: "https://portal.example/y".to_string(),
            text: text[1..].to_string(),
        }]
    );
}

#[tokio::test]
async fn next_day_permits_the_same_subject_again() {
    let clock = clock();
    let sink = Arc::new(CollectingAlertSink::new());
    let pipeline = PortalPipeline::new(
        &Config::default(),
        Arc::new(MemoryDetails::default()),
        sink.clone(),
        clock.clone(),
    )
    .unwrap();

    let text = format!("{PHRASE} 08:00 Uhr");
    let today = notification_table(&[("03.02.2026", "08:00:00", &text, "/x")]);
    pipeline.process_notifications(&today).await.unwrap();

    clock.set(
        NaiveDate::from_ymd_opt(2026, 3, 3)
            .unwrap()
            .and_hms_opt(7, 50, 0)
            .unwrap(),
    );
    let tomorrow = notification_table(&[("03.03.2026", "08:00:00", &text, "/x")]);
    let outcome = pipeline.process_notifications(&tomorrow).await.unwrap();

    assert_eq!(outcome.admitted.len(), 1);
    assert_eq!(sink.alerts().len(), 2);
}

#[tokio::test]
async fn text_only_table_yields_no_rows() {
    let (pipeline, sink) = pipeline(MemoryDetails::default());

    let outcome = pipeline
        .process_notifications("Keine Benachrichtigungen")
        .await
        .unwrap();
    assert_eq!(outcome.rows_total, 0);
    assert!(sink.alerts().is_empty());
}

#[tokio::test]
async fn binary_table_is_reported() {
    let (pipeline, _sink) = pipeline(MemoryDetails::default());
    assert!(matches!(
        pipeline.process_notifications("<table>\0</table>").await,
        Err(AppError::Parse(_))
    ));
}

const BLACKBOARD: &str = r#"<div id="cell_blackboardtype1"><ul>
    <li><span class="titel">Klausureinsicht</span><span class="date">02.03.2026</span>
        <div class="abstract">Kurz <a href="/bb/7">weiter</a></div></li>
    <li><span class="titel">Ohne Link</span><span class="date">01.03.2026</span>
        <div class="abstract"></div></li>
</ul></div>"#;

#[tokio::test]
async fn enriched_body_replaces_abstract() {
    let mut details = MemoryDetails::default();
    details.bodies.insert(
        "/bb/7".to_string(),
        "Die Einsicht ist am Freitag.\n".to_string(),
    );
    let (pipeline, _sink) = pipeline(details);

    let outcome = pipeline.process_announcements(BLACKBOARD).await.unwrap();
    assert_eq!(outcome.queued, 2);

    let messages = pipeline.queue().drain();
    assert_eq!(messages[0].title, "Klausureinsicht");
    assert_eq!(messages[0].body, "Die Einsicht ist am Freitag.\n");
}

#[tokio::test]
async fn scenario_c_entry_without_link_is_still_queued() {
    let (pipeline, _sink) = pipeline(MemoryDetails::default());

    let outcome = pipeline.process_announcements(BLACKBOARD).await.unwrap();
    assert_eq!(outcome.missing_links, 1);

    let messages = pipeline.queue().drain();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].title, "Ohne Link");
    assert_eq!(messages[1].link, "");
    assert_eq!(messages[1].body, "");
}

#[tokio::test]
async fn scenario_d_not_found_keeps_abstract() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/bb/7")
        .with_status(404)
        .create_async()
        .await;

    let mut config = Config::default();
    config.portal.base_url = server.url();
    let client = create_async_client(&config.portal).unwrap();
    let fetcher = HttpDetailFetcher::new(client, &config).unwrap();
    assert_eq!(fetcher.fetch_body("/bb/7").await, "");

    let sink = Arc::new(CollectingAlertSink::new());
    let pipeline = PortalPipeline::new(&config, Arc::new(fetcher), sink, clock()).unwrap();
    pipeline.process_announcements(BLACKBOARD).await.unwrap();

    let messages = pipeline.queue().drain();
    assert_eq!(messages[0].body, "Kurz weiter");
    assert_eq!(messages[0].link, "/bb/7");
}

#[test]
fn scenario_e_entities_are_decoded() {
    assert_eq!(normalize("Fu&szlig;note"), "Fußnote");
}

#[tokio::test]
async fn error_envelope_is_refused() {
    let (pipeline, _sink) = pipeline(MemoryDetails::default());

    let response = BlackboardResponse {
        status: 500,
        html: BLACKBOARD.to_string(),
    };
    assert!(pipeline.process_blackboard_response(&response).await.is_err());
    assert!(pipeline.queue().is_empty());

    let response = BlackboardResponse {
        status: 200,
        html: BLACKBOARD.to_string(),
    };
    let outcome = pipeline.process_blackboard_response(&response).await.unwrap();
    assert_eq!(outcome.queued, 2);
}

#[tokio::test]
async fn empty_envelope_queues_nothing() {
    let (pipeline, _sink) = pipeline(MemoryDetails::default());

    let response: BlackboardResponse =
        serde_json::from_str(r#"{"Status":200,"HTML":""}"#).unwrap();
    let outcome = pipeline.process_blackboard_response(&response).await.unwrap();

    assert_eq!(outcome.queued, 0);
    assert!(pipeline.queue().is_empty());
}
