/// Pick the next port in `[min, max]` given the ports already taken.
///
/// Prefers `highest + 1` so freshly released ports are not reused right away,
/// then falls back to the lowest gap once the top of the range is reached.
pub fn next_free_port(used: &[i32], min: i32, max: i32) -> Option<i32> {
    let mut in_range: Vec<i32> = used.iter().copied().filter(|p| (min..=max).contains(p)).collect();
    in_range.sort_unstable();
    in_range.dedup();
    match in_range.last() {
        None => Some(min),
        Some(&top) if top < max => Some(top + 1),
        Some(_) => {
            let mut expect = min;
            for p in in_range {
                if p != expect {
                    return Some(expect);
                }
                expect += 1;
            }
            None
        }
    }
}
