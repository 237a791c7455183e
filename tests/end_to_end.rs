//! End-to-End Tests
//!
//! Drives the public facade the way an application would:
//! - write records through a writable transaction
//! - read them back through `select` pipelines
//! - custom pipes written as closures
//! - durable engines queried after a restart

use rowkv::{
    select, Bucket, Engine, Error, FieldBuffer, FieldType, KvEngine, Limit, MaxInt64, Pipeline,
    RecordBuffer, RecordExt, Result, Transaction,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn seed_users(engine: &KvEngine) {
    let mut tx = engine.begin(true).unwrap();
    for (name, age) in [("Alice", 30), ("Bob", 41), ("Carol", 25), ("Dave", 37)] {
        let mut record = FieldBuffer::new();
        record.add_string("Name", name).unwrap();
        record.add_int64("Age", age).unwrap();
        tx.insert(&mut record, &["app", "users"]).unwrap();
    }
    tx.commit().unwrap();
}

/// Keeps records whose `Age` is at least `min`.
fn older_than(min: i64) -> impl Fn(Box<dyn Bucket>) -> Result<Box<dyn Bucket>> {
    move |mut input: Box<dyn Bucket>| -> Result<Box<dyn Bucket>> {
        let mut output = RecordBuffer::with_schema(input.schema()?);
        while let Some(record) = input.next()? {
            if record.get_int64("Age")? >= min {
                output.add(record);
            }
        }
        Ok(Box::new(output))
    }
}

#[test]
fn test_write_then_query() {
    init_tracing();
    let engine = KvEngine::default();
    seed_users(&engine);

    let pipeline = Pipeline::new().pipe(older_than(30)).pipe(Limit::new(2));
    let mut out = select(&engine, &pipeline, &["app", "users"]).unwrap();

    let mut names = Vec::new();
    while let Some(record) = out.next().unwrap() {
        names.push(record.get_string("Name").unwrap());
    }
    assert_eq!(names, vec!["Alice", "Bob"]);
    assert_eq!(
        out.schema().unwrap().get("Age").unwrap().field_type,
        FieldType::Int64
    );
}

#[test]
fn test_custom_pipe_then_max() {
    init_tracing();
    let engine = KvEngine::default();
    seed_users(&engine);

    let pipeline = Pipeline::new()
        .pipe(older_than(26))
        .pipe(MaxInt64::new("Age"));
    let mut out = select(&engine, &pipeline, &["app", "users"]).unwrap();
    let record = out.next().unwrap().unwrap();
    assert_eq!(record.get_int64("max(Age)").unwrap(), 41);
    assert!(out.next().unwrap().is_none());
}

#[test]
fn test_failed_write_leaves_store_untouched() {
    init_tracing();
    let engine = KvEngine::default();
    seed_users(&engine);
    let version = engine.store().current_version();

    let mut tx = engine.begin(true).unwrap();
    let mut ok = FieldBuffer::new();
    ok.add_string("Name", "Eve").unwrap();
    tx.insert(&mut ok, &["app", "users"]).unwrap();

    let mut bad = FieldBuffer::new();
    bad.add_string("Age", "unknown").unwrap();
    assert!(matches!(
        tx.insert(&mut bad, &["app", "users"]),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(tx.commit(), Err(Error::TransactionAborted)));

    assert_eq!(engine.store().current_version(), version);
    let mut out = select(&engine, &Pipeline::new(), &["app", "users"]).unwrap();
    let mut count = 0;
    while out.next().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 4);
}

#[test]
fn test_engine_shared_across_threads() {
    init_tracing();
    let engine = std::sync::Arc::new(KvEngine::default());
    seed_users(&engine);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = std::sync::Arc::clone(&engine);
            std::thread::spawn(move || {
                let pipeline = Pipeline::new().pipe(MaxInt64::new("Age"));
                let mut out = select(&*engine, &pipeline, &["app", "users"]).unwrap();
                let record = out.next().unwrap().unwrap();
                record.get_int64("max(Age)").unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 41);
    }
}

#[test]
fn test_query_after_restart() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = KvEngine::open(dir.path()).unwrap();
        seed_users(&engine);
    }

    let engine = KvEngine::open(dir.path()).unwrap();
    let pipeline = Pipeline::new().pipe(MaxInt64::new("Age"));
    let mut out = select(&engine, &pipeline, &["app", "users"]).unwrap();
    assert_eq!(out.next().unwrap().unwrap().get_int64("max(Age)").unwrap(), 41);

    seed_users(&engine);
    let mut out = select(&engine, &Pipeline::new(), &["app", "users"]).unwrap();
    let mut count = 0;
    while out.next().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 8);
}
