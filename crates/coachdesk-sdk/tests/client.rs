use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{any, body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use coachdesk_marketing::{
    CampaignRepository, CampaignService, CampaignUseCases, CatalogGateway, DraftRequest, EmailDraft,
    EmailStatus, EntityId, GatewayError, MarketingError, PipelineEditor, RawCampaign, Segment,
    SegmentRepository,
};
use coachdesk_sdk::{Client, Error, FileTokenStore, StaticToken};

fn client(server: &MockServer, token: &str) -> Client {
    Client::new(format!("{}/api", server.uri()), StaticToken::new(token)).unwrap()
}

fn campaign_body() -> serde_json::Value {
    json!({
        "_id": "camp",
        "nombre": "Reto 30 dias",
        "segmentos": ["seg-vip"],
        "estadisticas": {"enviados": 10, "recibidos": 8, "abiertos": 4, "clicks": 1},
        "pipeline": {"etapas": [
            {"id": "s1", "nombre": "Bienvenida", "orden": 0},
            {"id": "s2", "nombre": "Seguimiento", "orden": 1}
        ]}
    })
}

#[tokio::test]
async fn test_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/campanas-correo/camp"))
        .and(header("authorization", "Bearer t0k3n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(campaign_body()))
        .expect(1)
        .mount(&server)
        .await;

    let raw = client(&server, "t0k3n").campaigns().get("camp").await.unwrap();
    assert_eq!(raw.id, "camp");
    assert_eq!(raw.name, "Reto 30 dias");
}

#[tokio::test]
async fn test_accepts_data_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/servicios/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"_id": "svc-1", "nombre": "Plan mensual", "precio": 49.9}]
        })))
        .mount(&server)
        .await;

    let services = client(&server, "t").catalog().services().await.unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].id, "svc-1");
    assert_eq!(services[0].name, "Plan mensual");
}

#[tokio::test]
async fn test_missing_token_never_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server, "");
    let result = CatalogGateway::list_clients(&client).await;
    assert_eq!(result.unwrap_err(), GatewayError::MissingCredential);
}

#[tokio::test]
async fn test_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/segments/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Segmento no encontrado"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/clientes"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
        .mount(&server)
        .await;

    let client = client(&server, "t");

    let err = client.segments().get("gone").await.unwrap_err();
    assert!(err.is_not_found_error());

    let missing = SegmentRepository::get(&client, &EntityId::from("gone")).await;
    assert_eq!(
        missing.unwrap_err(),
        GatewayError::NotFound { entity: "segment", id: "gone".into() }
    );

    let err = client.catalog().clients().await.unwrap_err();
    assert!(matches!(&err, Error::Api { message, status_code: 401, .. } if message == "jwt expired"));

    let unauthorized = CatalogGateway::list_clients(&client).await;
    assert!(matches!(unauthorized, Err(GatewayError::Unauthorized(_))));
}

#[tokio::test]
async fn test_file_token_is_read_per_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .and(header("authorization", "Bearer first"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/leads"))
        .and(header("authorization", "Bearer second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("config.toml");
    std::fs::write(&token_path, "token = \"first\"\n").unwrap();

    let client = Client::new(format!("{}/api", server.uri()), FileTokenStore::new(&token_path)).unwrap();
    client.catalog().leads().await.unwrap();

    std::fs::write(&token_path, "token = \"second\"\n").unwrap();
    client.catalog().leads().await.unwrap();
}

#[tokio::test]
async fn test_generate_draft_request_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/campanas-correo/generar-correo-ia"))
        .and(body_json(json!({
            "tematica": "Retos de verano",
            "tono": "cercano",
            "instrucciones": "Menciona el descuento"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contenido": "Hola {{nombre}}"})))
        .expect(1)
        .mount(&server)
        .await;

    let request = DraftRequest {
        topic: "Retos de verano".into(),
        tone: "cercano".into(),
        instructions: "Menciona el descuento".into(),
    };
    let draft = client(&server, "t").campaigns().generate_draft(&request).await.unwrap();
    assert_eq!(draft.content, "Hola {{nombre}}");
}

#[tokio::test]
async fn test_create_segment_omits_local_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/segments"))
        .and(body_partial_json(json!({"name": "VIP"})))
        .and(|req: &Request| {
            serde_json::from_slice::<serde_json::Value>(&req.body)
                .map(|body| body.get("id").is_none())
                .unwrap_or(false)
        })
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "seg-9", "name": "VIP"})))
        .expect(1)
        .mount(&server)
        .await;

    let created = SegmentRepository::create(&client(&server, "t"), &Segment::new("VIP", ""))
        .await
        .unwrap();
    assert_eq!(created.id, EntityId::from("seg-9"));
}

#[tokio::test]
async fn test_delete_accepts_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/segments/seg-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, "t").segments().delete("seg-1").await.unwrap();
}

#[tokio::test]
async fn test_load_and_rename_through_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/campanas-correo/camp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(campaign_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/segments/campaign/camp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/segments/seg-vip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "seg-vip",
            "name": "VIP",
            "variables": {"nombre": "Ana"},
            "clients": [{"id": "c1", "email": "ana@x.com", "kind": "client"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/campanas-correo/camp"))
        .and(body_partial_json(json!({
            "segmentos": ["seg-vip"],
            "pipeline": {"etapas": [{"id": "s1", "nombre": "Hola"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client(&server, "t");
    let service = CampaignService::new(
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend),
    );

    let campaign = service.load_campaign(&EntityId::from("camp")).await.unwrap();
    assert_eq!(campaign.segments().len(), 1);
    assert_eq!(campaign.pipeline().len(), 2);

    let mut editor = PipelineEditor::new(campaign);
    service
        .rename_stage(&mut editor, &EntityId::from("s1"), "  Hola ")
        .await
        .unwrap();
    assert_eq!(editor.pipeline().stages()[0].name(), "Hola");
}

#[tokio::test]
async fn test_failed_save_keeps_editor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/campanas-correo/camp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(campaign_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/segments/campaign/camp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/segments/seg-vip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let backend = client(&server, "t");
    let repo: Arc<dyn CampaignRepository> = Arc::new(backend.clone());
    let service = CampaignService::new(repo, Arc::new(backend.clone()), Arc::new(backend));

    let campaign = service.load_campaign(&EntityId::from("camp")).await.unwrap();
    assert!(campaign.segments().is_empty());

    let mut editor = PipelineEditor::new(campaign);
    let result = service
        .rename_stage(&mut editor, &EntityId::from("s2"), "Cierre")
        .await;
    assert!(matches!(result, Err(MarketingError::Network(_))));
    assert_eq!(editor.pipeline().stages()[1].name(), "Seguimiento");
}

fn campaign_with_email(status: &str) -> serde_json::Value {
    let mut body = campaign_body();
    body["pipeline"]["etapas"][0]["correos"] = json!([
        {"_id": "e-backend", "asunto": "Hola", "contenido": "Hola {{nombre}}", "estado": status}
    ]);
    body
}

#[tokio::test]
async fn test_update_reads_stored_campaign() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/campanas-correo/ack"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/campanas-correo/empty"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/campanas-correo/camp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": campaign_with_email("enviado")})))
        .mount(&server)
        .await;

    let backend = client(&server, "t");
    let campaigns = backend.campaigns();
    let ack = RawCampaign { id: "ack".into(), ..Default::default() };
    assert_eq!(campaigns.update(&ack).await.unwrap(), None);
    let empty = RawCampaign { id: "empty".into(), ..Default::default() };
    assert_eq!(campaigns.update(&empty).await.unwrap(), None);

    let camp = RawCampaign { id: "camp".into(), ..Default::default() };
    let stored = campaigns.update(&camp).await.unwrap().unwrap();
    let stages = stored.pipeline.unwrap().stages.unwrap();
    assert_eq!(stages[0].emails[0].id.as_deref(), Some("e-backend"));
}

#[tokio::test]
async fn test_added_email_takes_backend_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/campanas-correo/camp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(campaign_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/campanas-correo/camp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(campaign_with_email("abierto")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/segments/campaign/camp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/segments/seg-vip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/campanas-correo/camp"))
        .and(|req: &Request| {
            // the new unit goes out without an id
            serde_json::from_slice::<serde_json::Value>(&req.body)
                .map(|body| body["pipeline"]["etapas"][0]["correos"][0].get("id").is_none())
                .unwrap_or(false)
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(campaign_with_email("enviado")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = client(&server, "t");
    let service = CampaignService::new(
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        Arc::new(backend),
    );
    let campaign = service.load_campaign(&EntityId::from("camp")).await.unwrap();
    let mut editor = PipelineEditor::new(campaign);
    let s1 = EntityId::from("s1");

    let email_id = service
        .add_email_unit(&mut editor, &s1, EmailDraft::new("Hola", "Hola {{nombre}}"))
        .await
        .unwrap();
    assert_eq!(email_id, EntityId::from("e-backend"));

    assert_eq!(service.refresh_statuses(&mut editor).await.unwrap(), 1);
    let unit = editor.pipeline().get(&s1).unwrap().email(&email_id).unwrap();
    assert_eq!(unit.status(), EmailStatus::Opened);
}
