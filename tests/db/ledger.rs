//! Idempotency of the sale ledger: one row per reference, ever.

#[path = "../common/mod.rs"]
mod common;

use common::*;

#[test]
fn record_sale_creates_row_with_normalized_email() {
    let conn = setup_test_db();

    let insert = queries::record_sale_if_new(
        &conn,
        &NewSale {
            reference: "T1".to_string(),
            email: "  Buyer@Example.COM ".to_string(),
            credential_hash: "hash-a".to_string(),
            file_id: "guide.pdf".to_string(),
            download_limit: 3,
            amount_kobo: Some(500_000),
            domain: PaymentDomain::Live,
        },
    )
    .expect("insert");

    let SaleInsert::Created(sale) = insert else {
        panic!("first insert for a reference should create");
    };
    assert_eq!(sale.email, "buyer@example.com");
    assert_eq!(sale.downloads_used, 0);
    assert_eq!(sale.download_limit, 3);
    assert_eq!(sale.domain, PaymentDomain::Live);
}

#[test]
fn duplicate_reference_returns_existing_sale_unchanged() {
    let conn = setup_test_db();
    let (original, _password) = create_test_sale(&conn, "T1", "a@b.com");

    let replay = queries::record_sale_if_new(
        &conn,
        &NewSale {
            reference: "T1".to_string(),
            email: "a@b.com".to_string(),
            // A different credential: must never replace the stored hash
            credential_hash: "some-new-hash".to_string(),
            file_id: "guide.pdf".to_string(),
            download_limit: 3,
            amount_kobo: Some(500_000),
            domain: PaymentDomain::Test,
        },
    )
    .expect("replay insert");

    let SaleInsert::AlreadyExists(existing) = replay else {
        panic!("second insert for the same reference must not create");
    };
    assert_eq!(existing.id, original.id);
    assert_eq!(
        existing.credential_hash, original.credential_hash,
        "credential hash is immutable after creation"
    );
    assert_eq!(queries::count_sales(&conn).unwrap(), 1);
}

#[test]
fn distinct_references_create_distinct_sales() {
    let conn = setup_test_db();
    create_test_sale(&conn, "T1", "a@b.com");
    create_test_sale(&conn, "T2", "a@b.com");

    assert_eq!(queries::count_sales(&conn).unwrap(), 2);

    // Same email, two sales: the latest one wins the lookup
    let latest = queries::get_latest_sale_by_email(&conn, "a@b.com")
        .unwrap()
        .expect("sale");
    assert!(latest.reference == "T1" || latest.reference == "T2");
}

#[test]
fn lookup_by_email_is_normalized() {
    let conn = setup_test_db();
    create_test_sale(&conn, "T1", "a@b.com");

    let found = queries::get_latest_sale_by_email(&conn, "  A@B.COM ").unwrap();
    assert!(found.is_some(), "lookup should normalize the email first");
}

#[test]
fn concurrent_inserts_for_one_reference_create_one_sale() {
    let (pool, _db_file) = setup_test_pool();

    let handles: Vec<_> = (0..6)
        .map(|n| {
            let pool = pool.clone();
            std::thread::spawn(move || {
                let conn = pool.get().expect("conn");
                let insert = queries::record_sale_if_new(
                    &conn,
                    &NewSale {
                        reference: "T1".to_string(),
                        email: "a@b.com".to_string(),
                        credential_hash: format!("hash-{}", n),
                        file_id: "guide.pdf".to_string(),
                        download_limit: 3,
                        amount_kobo: Some(500_000),
                        domain: PaymentDomain::Test,
                    },
                )
                .expect("insert");
                matches!(insert, SaleInsert::Created(_))
            })
        })
        .collect();

    let created = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .filter(|won| *won)
        .count();

    assert_eq!(created, 1, "exactly one concurrent insert may win");
    let conn = pool.get().unwrap();
    assert_eq!(queries::count_sales(&conn).unwrap(), 1);
}

#[test]
fn lookup_by_unknown_reference_returns_none() {
    let conn = setup_test_db();
    assert!(queries::get_sale_by_reference(&conn, "missing")
        .unwrap()
        .is_none());
}
