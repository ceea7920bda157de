// Finite-difference transform applied before CM6 packing.
//
// Each pass replaces every sample except the first with its difference from
// the preceding original sample. The inverse pass is a running prefix sum.
// Arithmetic wraps, so `restore(apply(x, n), n) == x` for every i32 input.

/// One first-order difference pass, in place. `samples[0]` is left as is.
pub fn delta(samples: &mut [i32]) {
    // Walking right to left means samples[i - 1] still holds its original value.
    for i in (1..samples.len()).rev() {
        samples[i] = samples[i].wrapping_sub(samples[i - 1]);
    }
}

/// Undo one [`delta`] pass, in place.
pub fn undelta(samples: &mut [i32]) {
    for i in 1..samples.len() {
        samples[i] = samples[i].wrapping_add(samples[i - 1]);
    }
}

/// Apply `order` difference passes.
pub fn apply(samples: &mut [i32], order: u32) {
    for _ in 0..order {
        delta(samples);
    }
}

/// Undo `order` difference passes.
pub fn restore(samples: &mut [i32], order: u32) {
    for _ in 0..order {
        undelta(samples);
    }
}
