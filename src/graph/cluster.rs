//! Interval clustering: maximal groups of transitively overlapping or
//! touching intervals.

/// Group `(start, end, id)` intervals into clusters.
///
/// Two intervals join the same cluster when they overlap or abut
/// (`b.start <= a.end`), transitively. Clusters come back ordered by their
/// leftmost start; ids inside a cluster are in start order.
pub fn cluster_intervals(intervals: &[(u32, u32, usize)]) -> Vec<Vec<usize>> {
    let mut sorted: Vec<(u32, u32, usize)> = intervals.to_vec();
    sorted.sort_unstable_by_key(|&(s, e, id)| (s, e, id));

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut cur_end = 0u32;

    for (start, end, id) in sorted {
        if let Some(cluster) = clusters.last_mut().filter(|_| start <= cur_end) {
            cluster.push(id);
            cur_end = cur_end.max(end);
        } else {
            clusters.push(vec![id]);
            cur_end = end;
        }
    }

    clusters
}
