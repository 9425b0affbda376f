mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use x402_amoy::outcome::FailureDetails;
use x402_amoy::{
    ClientOptions, ErrorKind, HttpResponse, PaymentAwareClient, RequestState, TransportError,
    WalletIdentity,
};

async fn fetch(client: &PaymentAwareClient, wallet: &WalletIdentity) -> x402_amoy::RequestOutcome {
    client.request_resource(RESOURCE_URL, &headers(), wallet).await
}

#[tokio::test]
async fn test_challenge_is_paid_and_confirmed() {
    let transport = ScriptedTransport::new(paying_server(vec![requirement("1000")]));
    let client = client(transport.clone(), ClientOptions::default());
    let wallet = dev_wallet(0);

    let outcome = fetch(&client, &wallet).await;

    assert!(outcome.success, "unexpected failure: {:?}", outcome.error);
    assert_eq!(outcome.terminal_state(), RequestState::PaidAndConfirmed);
    assert!(outcome.error.is_none() && outcome.error_kind.is_none());

    // probe, challenged request, paid resubmission
    assert_eq!(transport.calls(), 3);

    let payments = transport.payments();
    assert_eq!(payments.len(), 1);
    let auth = &payments[0].payload.authorization;
    assert_eq!(auth.from, wallet.address);
    assert_eq!(auth.value, "1000");
    assert_eq!(
        outcome.tx_hash.as_deref(),
        Some(format!("0x{}", auth.nonce.trim_start_matches("0x")).as_str())
    );

    let requests = transport.requests();
    let paid = &requests[2];
    assert_eq!(paid.header("x-payment-debug"), Some("true"));
    assert_eq!(
        paid.header("Access-Control-Expose-Headers"),
        Some("X-PAYMENT-RESPONSE")
    );
    assert_eq!(paid.header("Accept"), Some("application/json"));
    assert!(requests[0].header("X-PAYMENT").is_none());
}

#[tokio::test]
async fn test_probe_is_recorded_but_optional() {
    let transport = ScriptedTransport::new(paying_server(vec![requirement("1000")]));
    let wallet = dev_wallet(0);

    let with_probe = fetch(&client(transport.clone(), ClientOptions::default()), &wallet).await;
    let probe = with_probe.probe.as_ref().unwrap();
    assert_eq!(probe.status, 402);
    assert_eq!(probe.body["accepts"][0]["maxAmountRequired"], "1000");

    let before = transport.calls();
    let without = fetch(&client(transport.clone(), no_probe()), &wallet).await;
    assert!(without.probe.is_none());
    assert!(without.success);
    assert_eq!(transport.calls() - before, 2);
}

#[tokio::test]
async fn test_probe_failure_does_not_change_outcome() {
    let server = paying_server(vec![requirement("1000")]);
    // The probe is the only request without x-payment-debug
    let transport = ScriptedTransport::new(move |req| {
        if req.header("x-payment-debug").is_none() {
            Err(TransportError::connection_refused(&req.url))
        } else {
            server(req)
        }
    });
    let outcome = fetch(&client(transport, ClientOptions::default()), &dev_wallet(0)).await;

    assert!(outcome.success);
    assert!(outcome.probe.is_none());
}

#[tokio::test]
async fn test_unaffordable_challenge_is_not_paid() {
    let transport = ScriptedTransport::new(paying_server(vec![requirement("10000000")]));
    let outcome = fetch(&client(transport.clone(), no_probe()), &dev_wallet(0)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::NoPaymentResponse));
    assert!(outcome.error.as_deref().unwrap().starts_with("No payment response:"));
    assert_eq!(outcome.status(), Some(402));
    assert_eq!(outcome.terminal_state(), RequestState::PaymentDeclinedOrFailed);
    match outcome.details.unwrap() {
        FailureDetails::NoPayment(details) => {
            assert_eq!(details.requirements.len(), 1);
            assert_eq!(details.body["error"], "X-PAYMENT header is required");
        }
        other => panic!("unexpected details: {other:?}"),
    }
    assert_eq!(transport.calls(), 1);
    assert!(transport.payments().is_empty());
}

#[tokio::test]
async fn test_first_payable_requirement_is_selected() {
    let mut wrong_network = requirement("500");
    wrong_network.network = "base-sepolia".to_string();
    let mut other_scheme = requirement("500");
    other_scheme.scheme = "upto".to_string();
    let too_expensive = requirement("250000");
    let payable = requirement("2500");

    let transport = ScriptedTransport::new(paying_server(vec![
        wrong_network,
        other_scheme,
        too_expensive,
        payable,
    ]));
    let outcome = fetch(&client(transport.clone(), no_probe()), &dev_wallet(1)).await;

    assert!(outcome.success);
    assert_eq!(transport.payments()[0].payload.authorization.value, "2500");
}

#[tokio::test]
async fn test_ceiling_is_configurable() {
    let transport = ScriptedTransport::new(paying_server(vec![requirement("250000")]));
    let options = ClientOptions {
        probe: false,
        debug_headers: true,
        max_payment_atomic: 250_000,
    };
    let outcome = fetch(&client(transport, options), &dev_wallet(0)).await;
    assert!(outcome.success);
}

#[tokio::test]
async fn test_challenge_without_402_keeps_requirements() {
    let accepts = vec![requirement("1000"), requirement("2000")];
    let transport = ScriptedTransport::new(move |_| Ok(HttpResponse::new(200, challenge_body(&accepts))));
    let outcome = fetch(&client(transport.clone(), no_probe()), &dev_wallet(0)).await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::NoPaymentResponse));
    assert_eq!(outcome.status(), Some(200));
    // Not a real challenge, so nothing is signed or resent
    assert_eq!(transport.calls(), 1);
    match outcome.details.unwrap() {
        FailureDetails::NoPayment(details) => {
            let amounts: Vec<&str> = details
                .requirements
                .iter()
                .map(|r| r.max_amount_required.as_str())
                .collect();
            assert_eq!(amounts, vec!["1000", "2000"]);
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[tokio::test]
async fn test_second_challenge_is_not_retried() {
    let accepts = vec![requirement("1000")];
    let transport = ScriptedTransport::new(move |_| Ok(HttpResponse::new(402, challenge_body(&accepts))));
    let outcome = fetch(&client(transport.clone(), no_probe()), &dev_wallet(0)).await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::NoPaymentResponse));
    // One challenged request and exactly one resubmission
    assert_eq!(transport.calls(), 2);
    match outcome.details.unwrap() {
        FailureDetails::NoPayment(details) => assert_eq!(details.requirements.len(), 2),
        other => panic!("unexpected details: {other:?}"),
    }
}

#[tokio::test]
async fn test_signing_failure_is_no_payment() {
    let transport = ScriptedTransport::new(paying_server(vec![requirement("1000")]));
    let wallet = WalletIdentity::new(0, Arc::new(FakeSigner::new("0xfeed", true)));
    let outcome = fetch(&client(transport.clone(), no_probe()), &wallet).await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::NoPaymentResponse));
    assert!(outcome.error.unwrap().contains("signing failed"));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_error_body_reason_and_debug_info_are_kept() {
    let transport = ScriptedTransport::new(|_| {
        Ok(
            HttpResponse::new(500, json!({ "error": "facilitator unavailable" }).to_string())
                .with_header("X-Debug-Info", "verify timed out"),
        )
    });
    let outcome = fetch(&client(transport, no_probe()), &dev_wallet(0)).await;

    assert_eq!(outcome.error.as_deref(), Some("No payment response: facilitator unavailable"));
    match outcome.details.unwrap() {
        FailureDetails::NoPayment(details) => {
            assert_eq!(details.status, 500);
            assert_eq!(details.debug_info.as_deref(), Some("verify timed out"));
            assert!(details.requirements.is_empty());
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_payment_response_header_is_decode_error() {
    let transport = ScriptedTransport::new(|_| Ok(HttpResponse::new(200, report_body())));
    let outcome = fetch(&client(transport, no_probe()), &dev_wallet(0)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::PaymentResponseDecodeError));
    assert_eq!(outcome.status(), Some(200));
    assert!(outcome.tx_hash.is_none());
}

#[tokio::test]
async fn test_malformed_payment_response_header_is_decode_error() {
    let transport = ScriptedTransport::new(|req| {
        if req.header("X-PAYMENT").is_none() {
            return Ok(HttpResponse::new(402, challenge_body(&[requirement("1000")])));
        }
        Ok(HttpResponse::new(200, report_body()).with_header("x-payment-response", "%%%not-base64"))
    });
    let outcome = fetch(&client(transport, no_probe()), &dev_wallet(0)).await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::PaymentResponseDecodeError));
    match outcome.details.unwrap() {
        FailureDetails::Decode(details) => {
            assert_eq!(details.raw_payment_response.as_deref(), Some("%%%not-base64"));
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_transaction_is_decode_error() {
    let transport = ScriptedTransport::new(|_| {
        Ok(HttpResponse::new(200, report_body()).with_header("x-payment-response", settlement_header("")))
    });
    let outcome = fetch(&client(transport, no_probe()), &dev_wallet(0)).await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::PaymentResponseDecodeError));
    assert!(outcome.error.unwrap().contains("no transaction hash"));
}

#[tokio::test]
async fn test_falsy_report_is_not_success() {
    let transport = ScriptedTransport::new(|_| {
        Ok(HttpResponse::new(200, json!({ "report": null }).to_string())
            .with_header("x-payment-response", settlement_header("0xabc")))
    });
    let outcome = fetch(&client(transport, no_probe()), &dev_wallet(0)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::NoPaymentResponse));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let transport = ScriptedTransport::new(|req| Err(TransportError::connection_refused(&req.url)));
    let outcome = fetch(&client(transport, ClientOptions::default()), &dev_wallet(2)).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error_kind, Some(ErrorKind::TransportError));
    assert_eq!(outcome.terminal_state(), RequestState::TransportFailed);
    assert!(!outcome.error.as_deref().unwrap().is_empty());
    match outcome.details.unwrap() {
        FailureDetails::Transport(err) => {
            let cause = err.cause.unwrap();
            assert_eq!(cause.code.as_deref(), Some("ECONNREFUSED"));
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_body_is_transport_error() {
    let transport = ScriptedTransport::new(|_| Ok(HttpResponse::new(502, "<html>Bad Gateway</html>")));
    let outcome = fetch(&client(transport, no_probe()), &dev_wallet(0)).await;

    assert_eq!(outcome.error_kind, Some(ErrorKind::TransportError));
    match outcome.details.unwrap() {
        FailureDetails::Transport(err) => assert_eq!(err.error_type, "MalformedBody"),
        other => panic!("unexpected details: {other:?}"),
    }
}
