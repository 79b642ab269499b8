use std::cmp::Ordering;

/// Compares two dotted numeric versions. Missing components read as zero,
/// so `"1.0"` and `"1.0.0"` are equal. Non-numeric components read as zero.
fn compare(a: &str, b: &str) -> Ordering {
    let parts = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|p| p.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let a = parts(a);
    let b = parts(b);
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// True iff `current` satisfies the minimum version `required` published by
/// the service.
pub fn version_supported(current: &str, required: &str) -> bool {
    compare(current, required) != Ordering::Less
}
