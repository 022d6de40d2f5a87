//! Integration tests for the gateway client.
//!
//! Drives `GatewayClient` end to end through an in-memory gateway that records
//! every request it receives.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use fatzebra::{
    Amount, CallContext, Credentials, Environment, GatewayClient, GatewayConfig, GatewayError,
    PurchaseRequest, TokenizeCode, generate_reference,
    signing::MessageSigner,
    transport::{HttpSend, clone_request},
};
use http::{Method, Request, Response, StatusCode, header::AUTHORIZATION};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

const SECRET: &str = "shared-secret";

/// Replays canned responses in order and records the requests.
#[derive(Debug, Default)]
struct MockGateway {
    responses: Mutex<VecDeque<(u16, Value)>>,
    requests: Mutex<Vec<Request<Vec<u8>>>>,
}

impl MockGateway {
    fn respond(self, status: u16, body: Value) -> Self {
        self.responses.lock().unwrap().push_back((status, body));
        self
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> Request<Vec<u8>> {
        clone_request(&self.requests.lock().unwrap()[index])
    }
}

impl HttpSend for MockGateway {
    async fn send(&self, request: &Request<Vec<u8>>) -> fatzebra::Result<Response<Vec<u8>>> {
        self.requests.lock().unwrap().push(clone_request(request));
        let (status, body) =
            self.responses.lock().unwrap().pop_front().expect("unexpected request to mock gateway");

        let mut response = Response::new(serde_json::to_vec(&body).unwrap());
        *response.status_mut() = StatusCode::from_u16(status).unwrap();
        Ok(response)
    }
}

/// Never answers.
#[derive(Debug)]
struct HangingGateway;

impl HttpSend for HangingGateway {
    async fn send(&self, _request: &Request<Vec<u8>>) -> fatzebra::Result<Response<Vec<u8>>> {
        std::future::pending().await
    }
}

fn config() -> GatewayConfig {
    GatewayConfig::new(Environment::Sandbox, Amount::from_dollars(1500.0))
}

fn credentials() -> Credentials {
    Credentials::new("TEST", "TEST".to_owned().into(), SECRET.to_owned().into())
}

fn client(gateway: MockGateway) -> (GatewayClient<Arc<MockGateway>>, Arc<MockGateway>) {
    let gateway = Arc::new(gateway);
    let client = GatewayClient::new(&config(), credentials(), Arc::clone(&gateway)).unwrap();
    (client, gateway)
}

fn purchase_json(reference: &str, amount: i64) -> Value {
    json!({
        "authorization": "55355",
        "id": "071-P-ZVFOLOPC",
        "card_number": "XXXXXXXXXXXX1111",
        "card_holder": "Jim Smith",
        "card_token": "a1bhj98j",
        "amount": amount,
        "successful": true,
        "message": "Approved",
        "reference": reference,
        "currency": "AUD",
        "transaction_date": "2025-07-17T13:38:27+10:00",
        "captured": true,
        "captured_amount": amount
    })
}

fn purchase_request(amount: Amount) -> PurchaseRequest {
    PurchaseRequest::new("a1bhj98j", amount, generate_reference("TEST-"), "203.0.113.7")
}

#[tokio::test]
async fn test_purchase_above_ceiling_sends_nothing() {
    let (client, gateway) = client(MockGateway::default());

    let err = client
        .do_purchase(&CallContext::new(), &purchase_request(Amount::from_cents(150_001)))
        .await
        .unwrap_err();

    match err {
        GatewayError::ExceedsMaximum { amount, maximum } => {
            assert_eq!(amount, Amount::from_cents(150_001));
            assert_eq!(maximum, Amount::from_cents(150_000));
        }
        other => panic!("expected ExceedsMaximum, got {other:?}"),
    }
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn test_purchase_at_ceiling_is_sent() {
    let request = purchase_request(Amount::from_cents(150_000));
    let (client, gateway) =
        client(MockGateway::default().respond(200, json!({
            "successful": true,
            "response": purchase_json(&request.reference, 150_000),
            "errors": []
        })));

    let purchase = client.do_purchase(&CallContext::new(), &request).await.unwrap();
    assert_eq!(purchase.amount, Amount::from_cents(150_000));
    assert_eq!(gateway.calls(), 1);
}

#[tokio::test]
async fn test_successful_purchase() {
    let request = purchase_request(Amount::from_dollars(10.0)).with_cvv("123");
    let (client, gateway) =
        client(MockGateway::default().respond(200, json!({
            "successful": true,
            "response": purchase_json(&request.reference, 1000),
            "errors": [],
            "test": true
        })));

    let purchase = client.do_purchase(&CallContext::new(), &request).await.unwrap();
    assert!(purchase.successful);
    assert_eq!(purchase.reference, request.reference);
    assert_eq!(purchase.message, "Approved");

    let sent = gateway.request(0);
    assert_eq!(sent.method(), Method::POST);
    assert_eq!(sent.uri(), "https://gateway.sandbox.fatzebra.com.au/v1.0/purchases");
    assert_eq!(sent.headers()["content-type"], "application/json");
    assert_eq!(sent.headers()[AUTHORIZATION], "Basic VEVTVDpURVNU");

    let body: Value = serde_json::from_slice(sent.body()).unwrap();
    assert_eq!(body["amount"], 1000);
    assert_eq!(body["card_token"], "a1bhj98j");
    assert_eq!(body["cvv"], "123");
    assert_eq!(body["capture"], true);
    assert_eq!(body["customer_ip"], "203.0.113.7");
    assert_eq!(body["reference"], request.reference.as_str());
}

#[tokio::test]
async fn test_declined_purchase_is_not_an_error() {
    let request = purchase_request(Amount::from_dollars(10.0));
    let mut declined = purchase_json(&request.reference, 1000);
    declined["successful"] = json!(false);
    declined["message"] = json!("Declined");

    let (client, _) = client(
        MockGateway::default()
            .respond(200, json!({ "successful": true, "response": declined, "errors": [] })),
    );

    let purchase = client.do_purchase(&CallContext::new(), &request).await.unwrap();
    assert!(!purchase.successful);
    assert_eq!(purchase.message, "Declined");
}

#[tokio::test]
async fn test_purchase_validation_error() {
    let request = purchase_request(Amount::from_dollars(10.0));
    let (client, _) = client(MockGateway::default().respond(200, json!({
        "successful": false,
        "response": null,
        "errors": ["Card token is invalid", "CVV is required"]
    })));

    let err = client.do_purchase(&CallContext::new(), &request).await.unwrap_err();
    assert_eq!(err.to_string(), "gateway rejected the request: Card token is invalid");
    match err {
        GatewayError::Validation { reference, errors, status } => {
            assert_eq!(reference.as_deref(), Some(request.reference.as_str()));
            assert_eq!(errors.len(), 2);
            assert_eq!(status, 200);
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_purchase_non_200_is_transport_error() {
    for status in [201, 401, 404, 500, 502] {
        let (client, _) = client(MockGateway::default().respond(status, json!({})));

        let err = client
            .do_purchase(&CallContext::new(), &purchase_request(Amount::from_cents(100)))
            .await
            .unwrap_err();
        assert!(
            matches!(err, GatewayError::Transport { status: s } if s == status),
            "status {status}: {err:?}"
        );
    }
}

#[tokio::test]
async fn test_purchase_success_without_record() {
    let (client, _) =
        client(MockGateway::default().respond(200, json!({ "successful": true, "errors": [] })));

    let err = client
        .do_purchase(&CallContext::new(), &purchase_request(Amount::from_cents(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn test_purchase_malformed_body() {
    let (client, _) = client(MockGateway::default().respond(200, json!("not an envelope")));

    let err = client
        .do_purchase(&CallContext::new(), &purchase_request(Amount::from_cents(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[tokio::test]
async fn test_lookup_single_match() {
    let (client, gateway) = client(MockGateway::default().respond(200, json!({
        "successful": true,
        "response": [purchase_json("SHOP 1&2", 500)],
        "errors": [],
        "records": 1,
        "total_records": 1,
        "page": 1,
        "total_pages": 1
    })));

    let purchase = client.purchase_by_reference(&CallContext::new(), "SHOP 1&2").await.unwrap();
    assert_eq!(purchase.reference, "SHOP 1&2");
    assert_eq!(purchase.amount, Amount::from_cents(500));

    let sent = gateway.request(0);
    assert_eq!(sent.method(), Method::GET);
    assert_eq!(
        sent.uri(),
        "https://gateway.sandbox.fatzebra.com.au/v1.0/purchases?reference=SHOP+1%262"
    );
    assert!(sent.headers().contains_key(AUTHORIZATION));
}

#[tokio::test]
async fn test_lookup_single_object_response() {
    let (client, _) = client(MockGateway::default().respond(200, json!({
        "successful": true,
        "response": purchase_json("REF-1", 500)
    })));

    let purchase = client.purchase_by_reference(&CallContext::new(), "REF-1").await.unwrap();
    assert_eq!(purchase.reference, "REF-1");
}

#[tokio::test]
async fn test_lookup_no_match_is_not_found() {
    let (client, _) = client(
        MockGateway::default().respond(200, json!({ "successful": true, "response": [] })),
    );

    let err = client.purchase_by_reference(&CallContext::new(), "REF-1").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound));
}

#[tokio::test]
async fn test_lookup_404_is_not_found() {
    let (client, _) = client(MockGateway::default().respond(404, json!({})));

    let err = client.purchase_by_reference(&CallContext::new(), "REF-1").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound));
}

#[tokio::test]
async fn test_lookup_several_matches_is_conflict() {
    let (client, _) = client(MockGateway::default().respond(200, json!({
        "successful": true,
        "response": [purchase_json("REF-1", 500), purchase_json("REF-1", 700)]
    })));

    let err = client.purchase_by_reference(&CallContext::new(), "REF-1").await.unwrap_err();
    assert!(matches!(err, GatewayError::ConflictingResults { count: 2 }));
}

#[tokio::test]
async fn test_lookup_unsuccessful_and_other_status() {
    let (client, _) = client(
        MockGateway::default()
            .respond(200, json!({ "successful": false, "errors": ["Not permitted"] }))
            .respond(503, json!({})),
    );

    let err = client.purchase_by_reference(&CallContext::new(), "REF-1").await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation { ref errors, .. } if errors == &["Not permitted"]));

    let err = client.purchase_by_reference(&CallContext::new(), "REF-1").await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport { status: 503 }));
}

#[tokio::test]
async fn test_lookup_rejects_empty_reference() {
    let (client, gateway) = client(MockGateway::default());

    let err = client.purchase_by_reference(&CallContext::new(), "").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidInput(_)));
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn test_tokenized_card() {
    let (client, gateway) = client(MockGateway::default().respond(200, json!({
        "successful": true,
        "response": {
            "token": "a1b/2",
            "card_holder": "Jim Smith",
            "card_number": "XXXXXXXXXXXX1111",
            "card_expiry": "2027-05-31",
            "card_type": "VISA",
            "authorized": true,
            "transaction_count": 4
        },
        "errors": []
    })));

    let card = client.tokenized_card(&CallContext::new(), "a1b/2").await.unwrap();
    assert_eq!(card.card_holder, "Jim Smith");
    assert_eq!(card.transaction_count, 4);

    assert_eq!(
        gateway.request(0).uri(),
        "https://gateway.sandbox.fatzebra.com.au/v1.0/credit_cards/a1b%2F2"
    );
}

#[tokio::test]
async fn test_tokenized_card_not_found() {
    let (client, _) = client(MockGateway::default().respond(404, json!({})));

    let err = client.tokenized_card(&CallContext::new(), "missing").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound));
}

#[tokio::test]
async fn test_tokenized_card_unsuccessful() {
    let (client, _) = client(
        MockGateway::default()
            .respond(200, json!({ "successful": false, "errors": ["Card not found"] })),
    );

    let err = client.tokenized_card(&CallContext::new(), "tok").await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation { reference: None, .. }));
}

#[tokio::test]
async fn test_cancelled_context_sends_nothing() {
    let (client, gateway) = client(MockGateway::default());
    let token = CancellationToken::new();
    token.cancel();
    let ctx = CallContext::new().with_cancellation(token);

    let err = client
        .do_purchase(&ctx, &purchase_request(Amount::from_cents(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Cancelled));

    let err = client.purchase_by_reference(&ctx, "REF-1").await.unwrap_err();
    assert!(matches!(err, GatewayError::Cancelled));
    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn test_cancellation_while_waiting_for_gateway() {
    let client = GatewayClient::new(&config(), credentials(), HangingGateway).unwrap();
    let token = CancellationToken::new();
    let ctx = CallContext::new().with_cancellation(token.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = client.tokenized_card(&ctx, "tok").await.unwrap_err();
    assert!(matches!(err, GatewayError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_while_waiting_for_gateway() {
    let client = GatewayClient::new(&config(), credentials(), HangingGateway).unwrap();
    let ctx = CallContext::new().with_timeout(Duration::from_secs(30));

    let err = client
        .do_purchase(&ctx, &purchase_request(Amount::from_cents(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Timeout));
    assert!(err.is_transient());
}

#[test]
fn test_direct_tokenize_via_redirect_query() {
    let (client, _) = client(MockGateway::default());
    let v = MessageSigner::new(SECRET.to_owned().into()).sign_tokenize(1, "abc123");

    let redirect = Request::get(format!("https://shop.example/cards?r=1&token=abc123&v={v}"))
        .body(Vec::<u8>::new())
        .unwrap();

    let result = client.parse_direct_tokenize_result(&redirect).unwrap();
    assert_eq!(result.code(), TokenizeCode::Successful);
    assert_eq!(result.card_token(), "abc123");
    assert!(result.errors().is_empty());
}

#[test]
fn test_direct_tokenize_via_post() {
    let (client, _) = client(MockGateway::default());
    let v = MessageSigner::new(SECRET.to_owned().into()).sign_tokenize(97, "");

    let body = json!({ "r": 97, "token": "", "v": v, "errors[]": ["Card number is invalid"] });
    let post = Request::post("https://shop.example/cards")
        .body(body.to_string().into_bytes())
        .unwrap();

    let result = client.parse_direct_tokenize_result(&post).unwrap();
    assert_eq!(result.code(), TokenizeCode::ValidationError);
    assert!(!result.is_successful());
    assert_eq!(result.errors(), ["Card number is invalid"]);
}

#[test]
fn test_direct_tokenize_rejects_forgery() {
    let (client, _) = client(MockGateway::default());
    let forged = MessageSigner::new("attacker".to_owned().into()).sign_tokenize(1, "stolen");

    let redirect = Request::get(format!("https://shop.example/cards?r=1&token=stolen&v={forged}"))
        .body(Vec::<u8>::new())
        .unwrap();
    assert!(matches!(
        client.parse_direct_tokenize_result(&redirect),
        Err(GatewayError::BadSignature)
    ));

    let garbage = Request::get("https://shop.example/cards?r=1&token=t&v=not-hex")
        .body(Vec::<u8>::new())
        .unwrap();
    assert!(matches!(
        client.parse_direct_tokenize_result(&garbage),
        Err(GatewayError::BadSignature)
    ));
}

#[test]
fn test_direct_tokenize_malformed_input() {
    let (client, _) = client(MockGateway::default());

    let redirect = Request::get("https://shop.example/cards?r=yes&token=t&v=00")
        .body(Vec::<u8>::new())
        .unwrap();
    assert!(matches!(
        client.parse_direct_tokenize_result(&redirect),
        Err(GatewayError::InvalidInput(_))
    ));

    let post = Request::post("https://shop.example/cards").body(b"{".to_vec()).unwrap();
    assert!(matches!(
        client.parse_direct_tokenize_result(&post),
        Err(GatewayError::InvalidInput(_))
    ));
}

#[test]
fn test_config_from_toml_to_client() {
    let toml = r#"
        environment = "production"
        max_amount_cents = 50000
        api_prefix = "/v1.0"

        [auth]
        username_env = "SHOP_FZ_USER"
        password_env = "SHOP_FZ_TOKEN"
        secret_env = "SHOP_FZ_SECRET"

        [http]
        timeout_secs = 20
    "#;

    let config = GatewayConfig::from_toml(toml).unwrap();
    let credentials = Credentials::from_lookup(&config.auth, |name| match name {
        "SHOP_FZ_USER" => Some("merchant".to_owned()),
        "SHOP_FZ_TOKEN" => Some("token".to_owned()),
        "SHOP_FZ_SECRET" => Some(SECRET.to_owned()),
        _ => None,
    })
    .unwrap();

    let client = GatewayClient::new(&config, credentials, MockGateway::default()).unwrap();
    assert_eq!(client.host(), "gateway.fatzebra.com.au");
    assert_eq!(client.max_amount(), Amount::from_dollars(500.0));
}

#[tokio::test]
async fn test_explicit_default_port_still_authenticates() {
    let config = GatewayConfig::from_toml(
        "host = \"gateway.fatzebra.com.au:443\"\nmax_amount_cents = 100",
    )
    .unwrap();
    let gateway = Arc::new(MockGateway::default().respond(200, json!({
        "successful": true,
        "response": { "token": "tok" },
        "errors": []
    })));
    let client = GatewayClient::new(&config, credentials(), Arc::clone(&gateway)).unwrap();

    client.tokenized_card(&CallContext::new(), "tok").await.unwrap();

    assert_eq!(client.host(), "gateway.fatzebra.com.au");
    let request = gateway.request(0);
    assert_eq!(request.uri(), "https://gateway.fatzebra.com.au/v1.0/credit_cards/tok");
    assert_eq!(request.headers()[AUTHORIZATION], "Basic VEVTVDpURVNU");
}

#[tokio::test]
async fn test_ipv6_host_authenticates() {
    let config = GatewayConfig::new(Environment::Sandbox, Amount::from_cents(100)).with_host("[::1]:8443");
    let gateway = Arc::new(MockGateway::default().respond(200, json!({
        "successful": true,
        "response": { "token": "tok" },
        "errors": []
    })));
    let client = GatewayClient::new(&config, credentials(), Arc::clone(&gateway)).unwrap();

    client.tokenized_card(&CallContext::new(), "tok").await.unwrap();

    let request = gateway.request(0);
    assert_eq!(request.uri(), "https://[::1]:8443/v1.0/credit_cards/tok");
    assert_eq!(request.headers()[AUTHORIZATION], "Basic VEVTVDpURVNU");
}

#[test]
fn test_client_rejects_malformed_host() {
    let config = GatewayConfig::new(Environment::Sandbox, Amount::from_cents(100)).with_host("a:b:c");
    let err = GatewayClient::new(&config, credentials(), MockGateway::default()).unwrap_err();
    assert!(matches!(err, GatewayError::Configuration(_)));
}

#[test]
fn test_client_rejects_zero_ceiling() {
    let config = GatewayConfig::new(Environment::Sandbox, Amount::ZERO);
    let err = GatewayClient::new(&config, credentials(), MockGateway::default()).unwrap_err();
    assert!(matches!(err, GatewayError::Configuration(_)));
}

#[tokio::test]
async fn test_concurrent_purchases_share_one_client() {
    let mut gateway = MockGateway::default();
    for i in 0..8 {
        gateway = gateway.respond(200, json!({
            "successful": true,
            "response": purchase_json(&format!("REF-{i}"), 100),
        }));
    }
    let (client, gateway) = client(gateway);
    let client = Arc::new(client);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                client
                    .do_purchase(&CallContext::new(), &purchase_request(Amount::from_cents(100)))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().unwrap().successful);
    }
    assert_eq!(gateway.calls(), 8);
}
