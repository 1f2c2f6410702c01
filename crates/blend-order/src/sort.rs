//! In-place MSB radix sort over 16-bit keys.

/// A primitive index paired with its quantized depth key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub index: u32,
    pub key: u16,
}

impl SortKey {
    #[inline]
    pub fn new(index: u32, key: u16) -> Self {
        Self { index, key }
    }
}

/// Anything that exposes a 16-bit radix key.
pub trait RadixKey {
    fn radix_key(&self) -> u16;
}

impl RadixKey for SortKey {
    #[inline]
    fn radix_key(&self) -> u16 {
        self.key
    }
}

impl RadixKey for u16 {
    #[inline]
    fn radix_key(&self) -> u16 {
        *self
    }
}

/// Sorts `items` ascending by key without comparing items to each other.
///
/// Each pass partitions the slice on one bit, from bit 15 down, and recurses
/// into both halves. Equal keys end up in no particular order.
pub fn radix_sort<T: RadixKey>(items: &mut [T]) {
    partition(items, 15);
}

fn partition<T: RadixKey>(items: &mut [T], bit: u32) {
    if items.len() < 2 {
        return;
    }

    let mask = 1u16 << bit;
    let mut left = 0;
    let mut right = items.len();
    loop {
        while left < right && items[left].radix_key() & mask == 0 {
            left += 1;
        }
        while left < right && items[right - 1].radix_key() & mask != 0 {
            right -= 1;
        }
        if left >= right {
            break;
        }
        items.swap(left, right - 1);
        left += 1;
        right -= 1;
    }

    if bit == 0 {
        return;
    }
    let (zeros, ones) = items.split_at_mut(left);
    partition(zeros, bit - 1);
    partition(ones, bit - 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal LCG so the tests stay deterministic without an RNG crate.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u16 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (self.0 >> 48) as u16
        }
    }

    fn make_keys(keys: impl IntoIterator<Item = u16>) -> Vec<SortKey> {
        keys.into_iter()
            .enumerate()
            .map(|(i, k)| SortKey::new(i as u32, k))
            .collect()
    }

    fn assert_sorted_permutation(input: &[SortKey], output: &[SortKey]) {
        assert!(
            output.windows(2).all(|w| w[0].key <= w[1].key),
            "output not ascending"
        );

        let mut expected = input.to_vec();
        expected.sort_by_key(|k| (k.key, k.index));
        let mut actual = output.to_vec();
        actual.sort_by_key(|k| (k.key, k.index));
        assert_eq!(expected, actual, "output is not a permutation of the input");
    }

    #[test]
    fn matches_comparison_sort_on_random_input() {
        let mut rng = Lcg(42);
        for len in [0, 1, 2, 3, 17, 1000, 10_000] {
            let input = make_keys((0..len).map(|_| rng.next()));
            let mut output = input.clone();
            radix_sort(&mut output);
            assert_sorted_permutation(&input, &output);

            let mut keys: Vec<u16> = input.iter().map(|k| k.key).collect();
            let mut reference = keys.clone();
            radix_sort(&mut keys);
            reference.sort_unstable();
            assert_eq!(keys, reference);
        }
    }

    #[test]
    fn all_equal_keys() {
        let input = make_keys(std::iter::repeat_n(0x5A5A, 64));
        let mut output = input.clone();
        radix_sort(&mut output);
        assert_sorted_permutation(&input, &output);
    }

    #[test]
    fn strictly_descending_keys() {
        let input = make_keys((0..=u16::MAX).rev().step_by(7));
        let mut output = input.clone();
        radix_sort(&mut output);
        assert_sorted_permutation(&input, &output);
        assert_eq!(output.first().map(|k| k.key), input.last().map(|k| k.key));
    }

    #[test]
    fn extreme_keys() {
        let input = make_keys([u16::MAX, 0, 1, u16::MAX - 1, 0x8000, 0x7FFF]);
        let mut output = input.clone();
        radix_sort(&mut output);
        let keys: Vec<u16> = output.iter().map(|k| k.key).collect();
        assert_eq!(keys, vec![0, 1, 0x7FFF, 0x8000, u16::MAX - 1, u16::MAX]);
    }
}
