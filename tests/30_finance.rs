mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use chrono::Utc;

use backoffice_api::database::models::ReceivableStatus;
use backoffice_api::workflow::{self, WorkflowError};
use common::{request, MemoryFinance, TestApp};

#[tokio::test]
async fn receivable_is_paid_exactly_once() -> Result<()> {
    let app = TestApp::new();
    app.finance.add_receivable("r-1");
    let token = app.token("u-1", "finance");
    let before = Utc::now();

    let status = app
        .send(request(Method::PUT, "/receivables/r-1/pay", Some(&token), None))
        .await
        .status();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let receivable = app.finance.receivable("r-1").unwrap();
    assert_eq!(receivable.status, ReceivableStatus::Paid);
    assert!(receivable.paid_at.unwrap() >= before);

    let (status, body) = app
        .send_json(request(Method::PUT, "/receivables/r-1/pay", Some(&token), None))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "receivable already paid");

    // The first payment timestamp survives the rejected retry
    assert_eq!(app.finance.receivable("r-1").unwrap().paid_at, receivable.paid_at);
    Ok(())
}

#[tokio::test]
async fn paying_unknown_receivable_is_not_found() -> Result<()> {
    let app = TestApp::new();
    let token = app.token("u-1", "finance");

    let (status, body) = app
        .send_json(request(Method::PUT, "/receivables/missing/pay", Some(&token), None))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn commission_approval_records_approver() -> Result<()> {
    let app = TestApp::new();
    app.finance.add_commission("cm-1");
    let token = app.token("fin-42", "finance");
    let before = Utc::now();

    let status = app
        .send(request(Method::PUT, "/commissions/cm-1/approve", Some(&token), None))
        .await
        .status();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let commission = app.finance.commission("cm-1").unwrap();
    assert!(commission.approved);
    assert_eq!(commission.approved_by.as_deref(), Some("fin-42"));
    assert!(commission.approved_at.unwrap() >= before);

    // A second approver cannot overwrite the first
    let other = app.token("fin-43", "finance");
    let (status, body) = app
        .send_json(request(Method::PUT, "/commissions/cm-1/approve", Some(&other), None))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "commission already approved");
    assert_eq!(app.finance.commission("cm-1").unwrap().approved_by.as_deref(), Some("fin-42"));
    Ok(())
}

#[tokio::test]
async fn finance_routes_require_finance_role() -> Result<()> {
    let app = TestApp::new();
    app.finance.add_receivable("r-1");
    app.finance.add_commission("cm-1");
    let admin = app.token("u-1", "admin");

    for (method, uri) in [
        (Method::GET, "/receivables"),
        (Method::PUT, "/receivables/r-1/pay"),
        (Method::GET, "/commissions"),
        (Method::PUT, "/commissions/cm-1/approve"),
    ] {
        let status = app.send(request(method, uri, Some(&admin), None)).await.status();
        assert_eq!(status, StatusCode::FORBIDDEN, "{} allowed for admin", uri);
    }

    assert_eq!(app.finance.receivable("r-1").unwrap().status, ReceivableStatus::Open);
    assert!(!app.finance.commission("cm-1").unwrap().approved);
    Ok(())
}

#[tokio::test]
async fn listings_filter_by_state() -> Result<()> {
    let app = TestApp::new();
    app.finance.add_receivable("r-1");
    app.finance.add_receivable("r-2");
    app.finance.add_commission("cm-1");
    app.finance.add_commission("cm-2");
    let token = app.token("u-1", "finance");

    app.send(request(Method::PUT, "/receivables/r-1/pay", Some(&token), None)).await;
    app.send(request(Method::PUT, "/commissions/cm-1/approve", Some(&token), None)).await;

    let (_, body) = app
        .send_json(request(Method::GET, "/receivables?status=open", Some(&token), None))
        .await?;
    let open = body["data"].as_array().unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["id"], "r-2");
    assert_eq!(open[0]["amount"], "1500.00");

    let (_, body) = app
        .send_json(request(Method::GET, "/commissions?pending=true", Some(&token), None))
        .await?;
    let pending = body["data"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], "cm-2");

    let (status, _) = app
        .send_json(request(Method::GET, "/receivables?status=overdue", Some(&token), None))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn concurrent_payments_apply_once() -> Result<()> {
    let finance = Arc::new(MemoryFinance::default());
    finance.add_receivable("r-1");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let finance = finance.clone();
        handles.push(tokio::spawn(async move { workflow::mark_paid(finance.as_ref(), "r-1").await }));
    }

    let mut paid = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => paid += 1,
            Err(WorkflowError::AlreadyPaid) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(paid, 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_approvals_keep_single_approver() -> Result<()> {
    let finance = Arc::new(MemoryFinance::default());
    finance.add_commission("cm-1");

    let mut handles = Vec::new();
    for n in 0..8 {
        let finance = finance.clone();
        handles.push(tokio::spawn(async move {
            let approver = format!("fin-{}", n);
            workflow::approve_commission(finance.as_ref(), "cm-1", &approver)
                .await
                .map(|()| approver)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await? {
            Ok(approver) => winners.push(approver),
            Err(WorkflowError::AlreadyApproved) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(finance.commission("cm-1").unwrap().approved_by, Some(winners[0].clone()));

    let missing = workflow::approve_commission(finance.as_ref(), "cm-404", "fin-1").await;
    assert!(matches!(missing, Err(WorkflowError::NotFound)));
    Ok(())
}
