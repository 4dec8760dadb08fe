use crate::prefix::Prefix;

/// One unit of propagation work: either every announcement whose prefix
/// falls under `subnet` (when the block is small enough to batch), or the
/// single `prefix` itself when its announcement count alone meets the
/// iteration-size threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Subnet(Prefix),
    Prefix(Prefix),
}

/// Recursively bisects IPv4 address space into blocks no larger than
/// `iteration_size` announcements each, given a callback that reports how
/// many announcements exist under a candidate prefix. Mirrors the original
/// extrapolator's `populate_blocks`: a prefix with more rows than the
/// threshold is emitted on its own (`Block::Prefix`) in addition to being
/// split further for its children; everything else collapses to a single
/// `Block::Subnet` covering the whole range.
pub fn plan_blocks(
    root: Prefix,
    iteration_size: usize,
    count_under: &dyn Fn(&Prefix) -> usize,
    count_exact: &dyn Fn(&Prefix) -> usize,
) -> Vec<Block> {
    let mut blocks = Vec::new();
    bisect(root, iteration_size, count_under, count_exact, &mut blocks);
    blocks
}

fn bisect(
    p: Prefix,
    iteration_size: usize,
    count_under: &dyn Fn(&Prefix) -> usize,
    count_exact: &dyn Fn(&Prefix) -> usize,
    out: &mut Vec<Block>,
) {
    let count = count_under(&p);

    if count <= iteration_size {
        out.push(Block::Subnet(p));
        return;
    }

    if count_exact(&p) > 0 {
        out.push(Block::Prefix(p));
    }

    if p.prefix_len() >= 32 {
        return;
    }

    let (left, right) = split(p);
    bisect(left, iteration_size, count_under, count_exact, out);
    bisect(right, iteration_size, count_under, count_exact, out);
}

fn split(p: Prefix) -> (Prefix, Prefix) {
    let new_len = p.prefix_len() + 1;
    let left = Prefix::from_length(p.address, new_len);
    let bit = 1u32 << (32 - new_len as u32);
    let right = Prefix::from_length(p.address | bit, new_len);
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_root_stays_a_single_subnet_block() {
        let root: Prefix = "0.0.0.0/0".parse().unwrap();
        let blocks = plan_blocks(root, 1000, &|_p| 5, &|_p| 0);
        assert_eq!(blocks, vec![Block::Subnet(root)]);
    }

    #[test]
    fn oversized_root_is_split() {
        let root: Prefix = "0.0.0.0/0".parse().unwrap();
        let blocks = plan_blocks(
            root,
            10,
            &|p| if p.prefix_len() == 0 { 100 } else { 1 },
            &|_p| 0,
        );
        assert!(blocks.len() > 1);
    }
}
