use super::{adaptation_rate, suppress_blank, BackgroundModel, FOREGROUND};
use crate::config::{BackgroundConfig, MAX_MIXTURE_COMPONENTS};
use image::GrayImage;
use ndarray::{Array3, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, Zip};

#[derive(Debug, Clone, Copy)]
struct MixtureParams {
    variance_threshold: f32,
    background_ratio: f32,
    initial_variance: f32,
    min_variance: f32,
}

/// Per-pixel state, each array shaped (height, width, components)
#[derive(Debug, Clone)]
struct MixtureState {
    weights: Array3<f32>,
    means: Array3<f32>,
    variances: Array3<f32>,
}

/// Adaptive mixture of Gaussians per pixel (Stauffer-Grimson).
///
/// Components are ranked by `weight / sigma`; the leading ones whose weights
/// add up past `background_ratio` model the background. A pixel is
/// foreground when it matches none of those. Something that stays put long
/// enough gains weight and is absorbed into the background.
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    components: usize,
    learning_rate: f32,
    params: MixtureParams,
    state: Option<MixtureState>,
    seen: u64,
}

impl GaussianMixture {
    pub fn from_config(config: &BackgroundConfig) -> Self {
        Self {
            components: config.components.clamp(1, MAX_MIXTURE_COMPONENTS),
            learning_rate: config.learning_rate,
            params: MixtureParams {
                variance_threshold: config.variance_threshold,
                background_ratio: config.background_ratio,
                initial_variance: config.initial_variance,
                min_variance: config.min_variance,
            },
            state: None,
            seen: 0,
        }
    }

    pub fn components(&self) -> usize {
        self.components
    }

    fn seed(&self, pixels: ArrayView2<u8>) -> MixtureState {
        let (height, width) = pixels.dim();
        let shape = (height, width, self.components);

        let mut weights = Array3::zeros(shape);
        let mut means = Array3::zeros(shape);
        let variances = Array3::from_elem(shape, self.params.initial_variance);
        weights.index_axis_mut(Axis(2), 0).fill(1.0);
        means
            .index_axis_mut(Axis(2), 0)
            .assign(&pixels.mapv(f32::from));

        MixtureState {
            weights,
            means,
            variances,
        }
    }
}

impl BackgroundModel for GaussianMixture {
    fn update(&mut self, frame: &GrayImage) -> GrayImage {
        let (width, height) = frame.dimensions();
        let shape = (height as usize, width as usize);
        let mut mask = GrayImage::new(width, height);

        let pixels = match ArrayView2::from_shape(shape, frame.as_raw().as_slice()) {
            Ok(view) => view,
            Err(_) => return mask,
        };

        let established = self
            .state
            .as_ref()
            .map(|s| (s.weights.dim().0, s.weights.dim().1));
        if established != Some(shape) {
            self.state = Some(self.seed(pixels));
            self.seen = 1;
            return mask;
        }

        self.seen += 1;
        let rate = adaptation_rate(self.seen, self.learning_rate);
        let params = self.params;
        let Some(state) = self.state.as_mut() else {
            return mask;
        };

        if let Ok(mut out) = ArrayViewMut2::from_shape(shape, &mut *mask) {
            Zip::from(state.weights.lanes_mut(Axis(2)))
                .and(state.means.lanes_mut(Axis(2)))
                .and(state.variances.lanes_mut(Axis(2)))
                .and(&pixels)
                .and(&mut out)
                .par_for_each(|w, m, v, &p, o| {
                    if update_pixel(w, m, v, p as f32, rate, &params) {
                        *o = FOREGROUND;
                    }
                });
        }

        suppress_blank(frame, mask)
    }

    fn reset(&mut self) {
        self.state = None;
        self.seen = 0;
    }

    fn name(&self) -> &str {
        "mog"
    }
}

/// Classify one pixel against its mixture, then fold it in. Returns true for
/// foreground.
fn update_pixel(
    mut weight: ArrayViewMut1<f32>,
    mut mean: ArrayViewMut1<f32>,
    mut var: ArrayViewMut1<f32>,
    value: f32,
    rate: f32,
    params: &MixtureParams,
) -> bool {
    let k = weight.len();
    let mut ranks = [0usize; MAX_MIXTURE_COMPONENTS];
    for (i, slot) in ranks.iter_mut().enumerate() {
        *slot = i;
    }
    let order = &mut ranks[..k];
    order.sort_by(|&a, &b| {
        let fa = weight[a] / var[a].sqrt();
        let fb = weight[b] / var[b].sqrt();
        fb.total_cmp(&fa)
    });

    let matched = order.iter().position(|&i| {
        let d = value - mean[i];
        weight[i] > 0.0 && d * d <= params.variance_threshold * var[i]
    });

    let mut background = k;
    let mut cumulative = 0.0;
    for (rank, &i) in order.iter().enumerate() {
        cumulative += weight[i];
        if cumulative > params.background_ratio {
            background = rank + 1;
            break;
        }
    }
    let foreground = matched.map_or(true, |rank| rank >= background);

    weight.mapv_inplace(|w| w * (1.0 - rate));
    match matched {
        Some(rank) => {
            let i = order[rank];
            weight[i] += rate;
            let rho = (rate / weight[i]).min(1.0);
            let d = value - mean[i];
            mean[i] += rho * d;
            var[i] = (var[i] + rho * (d * d - var[i])).max(params.min_variance);
        }
        None => {
            // replace the least probable component
            let i = order[k - 1];
            weight[i] = rate;
            mean[i] = value;
            var[i] = params.initial_variance;
        }
    }

    let total = weight.sum();
    if total > 0.0 {
        weight.mapv_inplace(|w| w / total);
    }

    foreground
}
