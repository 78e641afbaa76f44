//! Sale lifecycle: stock, ledger and outbox through create / update / delete.

mod common;

use common::{actor, engine, product, service, stock};
use tally_core::{LedgerReason, LineItemInput, ReferenceType, SalePayload, StockDirection};

fn completed(lines: Vec<LineItemInput>) -> SalePayload {
    SalePayload::new("completed", "cash", lines)
}

#[tokio::test]
async fn test_status_round_trip_scenario() {
    let engine = engine().await;
    let actor = actor();
    let p = product(&engine, "P", 500, 300, 10).await;

    let created = engine
        .create_sale(&completed(vec![LineItemInput::new(&p.id, 3, 500)]), &actor)
        .await
        .unwrap();
    let sale_id = created.record.id.clone();
    assert_eq!(stock(&engine, &p).await, 7);

    let cancelled = completed(vec![LineItemInput::new(&p.id, 3, 500)]).with_status("cancelled");
    let outcome = engine.update_sale(&sale_id, &cancelled, Some(1), &actor).await.unwrap();
    assert_eq!(outcome.record.version, 2);
    assert_eq!(stock(&engine, &p).await, 10);

    let recompleted = completed(vec![LineItemInput::new(&p.id, 3, 500)]);
    engine.update_sale(&sale_id, &recompleted, Some(2), &actor).await.unwrap();
    assert_eq!(stock(&engine, &p).await, 7);

    engine.delete_sale(&sale_id, Some(3), &actor).await.unwrap();
    assert_eq!(stock(&engine, &p).await, 10);
    assert!(engine.sale(&sale_id).await.unwrap().is_none());

    let ledger = engine.ledger_for(ReferenceType::Sale, &sale_id).await.unwrap();
    let summary: Vec<(i64, LedgerReason)> = ledger.iter().map(|e| (e.signed_quantity(), e.reason)).collect();
    assert_eq!(
        summary,
        vec![
            (-3, LedgerReason::SaleCompleted),
            (3, LedgerReason::SaleReturned),
            (-3, LedgerReason::SaleStatusChanged),
            (3, LedgerReason::SaleDeleted),
        ]
    );
    assert!(ledger.iter().all(|e| e.product_id == p.id));
    assert_eq!(ledger.last().unwrap().stock_after, Some(10));
}

#[tokio::test]
async fn test_pending_sale_never_touches_stock() {
    let engine = engine().await;
    let actor = actor();
    let p = product(&engine, "P", 500, 300, 10).await;

    let pending = SalePayload::new("pending", "credit", vec![LineItemInput::new(&p.id, 4, 500)]);
    let created = engine.create_sale(&pending, &actor).await.unwrap();
    assert_eq!(stock(&engine, &p).await, 10);
    assert_eq!(created.ledger.len(), 1);
    assert_eq!(created.ledger[0].reason, LedgerReason::SalePending);
    assert_eq!(created.ledger[0].quantity, 0);
    assert_eq!(created.ledger[0].direction, StockDirection::Unchanged);

    let deleted = engine.delete_sale(&created.record.id, None, &actor).await.unwrap();
    assert_eq!(stock(&engine, &p).await, 10);
    assert_eq!(deleted.ledger.len(), 1);
    assert_eq!(deleted.ledger[0].reason, LedgerReason::SaleDeleted);
    assert_eq!(deleted.ledger[0].quantity, 0);
}

#[tokio::test]
async fn test_completed_sale_reduces_by_line_quantities() {
    let engine = engine().await;
    let actor = actor();
    let a = product(&engine, "A", 100, 60, 20).await;
    let b = product(&engine, "B", 250, 150, 5).await;

    engine
        .create_sale(
            &completed(vec![LineItemInput::new(&a.id, 2, 100), LineItemInput::new(&b.id, 5, 250)]),
            &actor,
        )
        .await
        .unwrap();

    assert_eq!(stock(&engine, &a).await, 18);
    assert_eq!(stock(&engine, &b).await, 0);
}

#[tokio::test]
async fn test_quantity_edit_records_net_difference() {
    let engine = engine().await;
    let actor = actor();
    let p = product(&engine, "P", 500, 300, 20).await;

    let created = engine
        .create_sale(&completed(vec![LineItemInput::new(&p.id, 5, 500)]), &actor)
        .await
        .unwrap();
    let line_id = created.items[0].id.clone();
    assert_eq!(stock(&engine, &p).await, 15);

    let edited = completed(vec![LineItemInput::new(&p.id, 8, 500).with_id(&line_id)]);
    let outcome = engine
        .update_sale(&created.record.id, &edited, None, &actor)
        .await
        .unwrap();

    assert_eq!(stock(&engine, &p).await, 12);
    assert_eq!(outcome.ledger.len(), 1);
    assert_eq!(outcome.ledger[0].reason, LedgerReason::SaleItemIncreased);
    assert_eq!(outcome.ledger[0].quantity, 3);
    assert_eq!(outcome.ledger[0].direction, StockDirection::Out);

    // The edited line keeps its identity
    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].id, line_id);
}

#[tokio::test]
async fn test_item_added_removed_and_decreased() {
    let engine = engine().await;
    let actor = actor();
    let a = product(&engine, "A", 100, 60, 50).await;
    let b = product(&engine, "B", 100, 60, 50).await;
    let c = product(&engine, "C", 100, 60, 50).await;

    let created = engine
        .create_sale(
            &completed(vec![LineItemInput::new(&a.id, 4, 100), LineItemInput::new(&b.id, 2, 100)]),
            &actor,
        )
        .await
        .unwrap();

    let edited = completed(vec![LineItemInput::new(&a.id, 1, 100), LineItemInput::new(&c.id, 6, 100)]);
    let outcome = engine
        .update_sale(&created.record.id, &edited, Some(1), &actor)
        .await
        .unwrap();

    let reasons: Vec<(String, LedgerReason, i64)> = outcome
        .ledger
        .iter()
        .map(|e| (e.product_id.clone(), e.reason, e.signed_quantity()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            (a.id.clone(), LedgerReason::SaleItemDecreased, 3),
            (c.id.clone(), LedgerReason::SaleItemAdded, -6),
            (b.id.clone(), LedgerReason::SaleItemRemoved, 2),
        ]
    );

    assert_eq!(stock(&engine, &a).await, 49);
    assert_eq!(stock(&engine, &b).await, 50);
    assert_eq!(stock(&engine, &c).await, 44);
}

#[tokio::test]
async fn test_duplicate_lines_are_merged_before_diffing() {
    let engine = engine().await;
    let actor = actor();
    let p = product(&engine, "P", 100, 60, 30).await;

    let created = engine
        .create_sale(
            &completed(vec![LineItemInput::new(&p.id, 2, 100), LineItemInput::new(&p.id, 3, 100)]),
            &actor,
        )
        .await
        .unwrap();
    assert_eq!(created.ledger.len(), 1);
    assert_eq!(created.ledger[0].quantity, 5);

    // Same total split differently: no stock movement
    let outcome = engine
        .update_sale(
            &created.record.id,
            &completed(vec![LineItemInput::new(&p.id, 5, 100)]),
            None,
            &actor,
        )
        .await
        .unwrap();
    assert!(outcome.ledger.is_empty());
    assert_eq!(stock(&engine, &p).await, 25);
}

#[tokio::test]
async fn test_services_are_inert() {
    let engine = engine().await;
    let actor = actor();
    let p = product(&engine, "P", 500, 300, 10).await;
    let wrap = service(&engine, "Gift Wrap", 150).await;

    let created = engine
        .create_sale(
            &completed(vec![LineItemInput::new(&p.id, 1, 500), LineItemInput::new(&wrap.id, 2, 150)]),
            &actor,
        )
        .await
        .unwrap();

    assert_eq!(created.items.len(), 2);
    assert_eq!(created.ledger.len(), 1);
    assert_eq!(created.ledger[0].product_id, p.id);

    engine.delete_sale(&created.record.id, None, &actor).await.unwrap();

    let ledger = engine
        .ledger_for(ReferenceType::Sale, &created.record.id)
        .await
        .unwrap();
    assert!(ledger.iter().all(|e| e.product_id != wrap.id));
    assert_eq!(stock(&engine, &p).await, 10);
}

#[tokio::test]
async fn test_ledger_sum_matches_stock_change() {
    let engine = engine().await;
    let actor = actor();
    let a = product(&engine, "A", 100, 60, 40).await;
    let b = product(&engine, "B", 100, 60, 15).await;

    let created = engine
        .create_sale(
            &SalePayload::new("pending", "cash", vec![LineItemInput::new(&a.id, 3, 100)]),
            &actor,
        )
        .await
        .unwrap();
    let id = created.record.id.clone();

    let steps = vec![
        completed(vec![LineItemInput::new(&a.id, 3, 100), LineItemInput::new(&b.id, 4, 100)]),
        completed(vec![LineItemInput::new(&a.id, 7, 100)]),
        completed(vec![LineItemInput::new(&a.id, 7, 100)]).with_status("refunded"),
        SalePayload::new("partial", "credit", vec![LineItemInput::new(&b.id, 20, 100)]).with_received(0),
    ];
    for payload in &steps {
        engine.update_sale(&id, payload, None, &actor).await.unwrap();
    }
    engine.delete_sale(&id, None, &actor).await.unwrap();

    for (p, opening) in [(&a, 40), (&b, 15)] {
        let net = engine.ledger_net_change(&p.id).await.unwrap();
        assert_eq!(net, stock(&engine, p).await - opening, "product {}", p.sku);
    }
    // Everything given back after delete
    assert_eq!(stock(&engine, &a).await, 40);
    assert_eq!(stock(&engine, &b).await, 15);
}

#[tokio::test]
async fn test_overselling_goes_negative_and_is_logged() {
    let engine = engine().await;
    let actor = actor();
    let p = product(&engine, "P", 100, 60, 2).await;

    let created = engine
        .create_sale(&completed(vec![LineItemInput::new(&p.id, 5, 100)]), &actor)
        .await
        .unwrap();

    assert_eq!(stock(&engine, &p).await, -3);
    assert_eq!(created.ledger[0].stock_after, Some(-3));
}

#[tokio::test]
async fn test_outbox_receives_one_adjustment_per_mutation() {
    let engine = engine().await;
    let actor = actor();
    let p = product(&engine, "P", 500, 300, 10).await;

    let payload = completed(vec![LineItemInput::new(&p.id, 2, 500)]).with_received(600);
    let created = engine.create_sale(&payload, &actor).await.unwrap();
    assert!(created.financial_recorded);

    engine
        .update_sale(&created.record.id, &payload.clone().with_status("paid"), None, &actor)
        .await
        .unwrap();
    engine.delete_sale(&created.record.id, None, &actor).await.unwrap();

    let entries = engine
        .financial_outbox()
        .for_transaction(&created.record.id)
        .await
        .unwrap();
    let events: Vec<&str> = entries.iter().map(|e| e.event.as_str()).collect();
    assert_eq!(events, vec!["created", "updated", "deleted"]);

    let first: serde_json::Value = serde_json::from_str(&entries[0].payload).unwrap();
    assert_eq!(first["total_cents"], 1000);
    assert_eq!(first["cogs_cents"], 600);
    assert_eq!(first["received_cents"], 600);
    assert_eq!(first["outstanding_cents"], 400);
}

#[tokio::test]
async fn test_ledger_notes_carry_context() {
    let engine = engine().await;
    let actor = actor();
    let p = product(&engine, "P", 500, 300, 10).await;

    let created = engine
        .create_sale(
            &completed(vec![LineItemInput::new(&p.id, 1, 500)]).with_customer("Ayesha"),
            &actor,
        )
        .await
        .unwrap();

    let history = engine.product_history(&p.id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    let note = history[0].note.as_deref().unwrap();
    assert!(note.contains("status: completed"));
    assert!(note.contains("payment: cash"));
    assert!(note.contains("party: Ayesha"));
    assert_eq!(history[0].reference_id, created.record.id);
    assert_eq!(history[0].device_id, "till-1");
}

#[tokio::test]
async fn test_clamped_return_records_applied_quantity() {
    let engine = engine().await;
    let actor = actor();
    let p = product(&engine, "P", 100, 60, 10).await;

    let payload = completed(vec![LineItemInput::new(&p.id, 3, 100)]);
    let created = engine.create_sale(&payload, &actor).await.unwrap();
    engine.adjust_stock(&p.id, -20, "write-off", &actor).await.unwrap();
    assert_eq!(stock(&engine, &p).await, -13);

    // Giving back 3 onto -13 lands on 0, so the row carries 13
    let outcome = engine
        .update_sale(&created.record.id, &payload.clone().with_status("cancelled"), None, &actor)
        .await
        .unwrap();
    assert_eq!(stock(&engine, &p).await, 0);
    assert_eq!(outcome.ledger[0].reason, LedgerReason::SaleReturned);
    assert_eq!(outcome.ledger[0].signed_quantity(), 13);
    assert_eq!(engine.ledger_net_change(&p.id).await.unwrap(), -10);
}
