//! Key encoding shared by the store implementations.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, Env};

use crate::LmdbError;

/// Decode an 8-byte big-endian id key.
pub(crate) fn be_u64(db: &'static str, key: &[u8]) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = key.try_into().map_err(|_| LmdbError::CorruptKey {
        db,
        detail: format!("expected 8 bytes, got {}", key.len()),
    })?;
    Ok(u64::from_be_bytes(arr))
}

/// Decode a UTF-8 string key (principals, model ids).
pub(crate) fn utf8(db: &'static str, key: &[u8]) -> Result<String, LmdbError> {
    std::str::from_utf8(key)
        .map(str::to_string)
        .map_err(|e| LmdbError::CorruptKey {
            db,
            detail: e.to_string(),
        })
}

/// Smallest key greater than every key starting with `prefix`.
/// `None` when the prefix is all `0xFF`.
pub(crate) fn increment_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

pub(crate) fn put(env: &Env, db: &Database<Bytes, Bytes>, key: &[u8], value: &[u8]) -> Result<(), LmdbError> {
    let mut wtxn = env.write_txn()?;
    db.put(&mut wtxn, key, value)?;
    wtxn.commit()?;
    Ok(())
}

pub(crate) fn get(env: &Env, db: &Database<Bytes, Bytes>, key: &[u8]) -> Result<Option<Vec<u8>>, LmdbError> {
    let rtxn = env.read_txn()?;
    Ok(db.get(&rtxn, key)?.map(|b| b.to_vec()))
}

/// Every key/value pair in key order.
pub(crate) fn scan(env: &Env, db: &Database<Bytes, Bytes>) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LmdbError> {
    let rtxn = env.read_txn()?;
    let mut out = Vec::new();
    for item in db.iter(&rtxn)? {
        let (key, val) = item?;
        out.push((key.to_vec(), val.to_vec()));
    }
    Ok(out)
}

/// Values whose key starts with `prefix`, in key order.
pub(crate) fn scan_prefix(
    env: &Env,
    db: &Database<Bytes, Bytes>,
    prefix: &[u8],
) -> Result<Vec<Vec<u8>>, LmdbError> {
    let rtxn = env.read_txn()?;
    let upper = increment_prefix(prefix);
    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (
        Bound::Included(prefix),
        match &upper {
            Some(upper) => Bound::Excluded(upper.as_slice()),
            None => Bound::Unbounded,
        },
    );
    let mut out = Vec::new();
    for item in db.range(&rtxn, &bounds)? {
        let (_key, val) = item?;
        out.push(val.to_vec());
    }
    Ok(out)
}
