//! ハンドラーに注入する乱数源
//!
//! ヒューリスティックに加えるノイズを実行ごとに注入するための型です。
//! シードを指定すれば同じ入力から同じ出力が得られます。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// シード指定可能な一様乱数源
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: StdRng,
}

impl NoiseSource {
    /// シードを指定して生成（再現可能）
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// OS のエントロピーから生成
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// `a` と `b` の間の一様乱数（両端を含む）
    ///
    /// `a > b` の場合は入れ替えて扱います。どちらかが有限でない、
    /// または両者が等しい場合は `a` をそのまま返します。
    pub fn uniform(&mut self, a: f64, b: f64) -> f64 {
        if !a.is_finite() || !b.is_finite() || a == b {
            return a;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        self.rng.gen_range(low..=high)
    }
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = NoiseSource::seeded(42);
        let mut b = NoiseSource::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.uniform(-1.0, 1.0), b.uniform(-1.0, 1.0));
        }
    }

    #[test]
    fn test_uniform_within_bounds() {
        let mut noise = NoiseSource::seeded(7);
        for _ in 0..100 {
            let v = noise.uniform(-0.2, 0.2);
            assert!((-0.2..=0.2).contains(&v));
        }
    }

    #[test]
    fn test_uniform_reversed_bounds() {
        let mut noise = NoiseSource::seeded(7);
        for _ in 0..100 {
            let v = noise.uniform(0.0, -0.5);
            assert!((-0.5..=0.0).contains(&v));
        }
    }

    #[test]
    fn test_uniform_degenerate() {
        let mut noise = NoiseSource::seeded(1);
        assert_eq!(noise.uniform(0.0, 0.0), 0.0);
        assert_eq!(noise.uniform(3.0, f64::NAN), 3.0);
    }
}
