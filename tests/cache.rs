use std::sync::Arc;
use std::thread;
use treepath::{compile, PathCache, Value, DEFAULT_CACHE_CAPACITY, GLOBAL_CACHE};

#[test]
fn test_cache_is_bounded_and_paths_still_work() {
    let cache = PathCache::new(DEFAULT_CACHE_CAPACITY);
    let mut root = treepath::Map::new();
    for i in 0..2000 {
        root.insert(format!("k{}", i), Value::Integer(i));
    }
    let root = Value::Object(root);

    for i in 0..2000 {
        let path = cache.compile(&format!("$.k{}", i)).unwrap();
        assert_eq!(path.eval(&root).unwrap(), Value::Integer(i));
    }
    assert_eq!(cache.len(), DEFAULT_CACHE_CAPACITY);
    let stats = cache.stats();
    assert_eq!(stats.misses, 2000);
    assert_eq!(stats.hits, 0);

    // Cached entries are served from the map; uncached ones recompile.
    assert!(Arc::ptr_eq(&cache.compile("$.k0").unwrap(), &cache.compile("$.k0").unwrap()));
    assert!(!Arc::ptr_eq(&cache.compile("$.k1999").unwrap(), &cache.compile("$.k1999").unwrap()));
}

#[test]
fn test_concurrent_first_compiles_agree() {
    let cache = Arc::new(PathCache::new(16));
    let root = Value::parse(r#"{"a":[{"b":1},{"b":2},{"b":3}]}"#).unwrap();
    let results: Vec<Value> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let root = &root;
                scope.spawn(move || {
                    let path = cache.compile("$.a[?(@.b >= 2)].b").unwrap();
                    path.eval(root).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for result in &results {
        assert_eq!(result, &Value::parse("[2,3]").unwrap());
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_global_cache_reuses_compiled_paths() {
    let first = compile("$.global.cache.entry").unwrap();
    let second = compile("$.global.cache.entry").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(GLOBAL_CACHE.len() <= GLOBAL_CACHE.capacity());
}
