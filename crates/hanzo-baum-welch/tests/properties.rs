use hanzo_baum_welch::{
    backward::backward, forward::forward, posterior::posteriors, reestimate::reestimate, Alphabet,
    DegenerateRowPolicy, EmConfig, HmmModel,
};
use proptest::collection::vec;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SYMBOLS: usize = 3;

fn random_model(states: usize, seed: u64) -> HmmModel {
    let mut rng = StdRng::seed_from_u64(seed);
    HmmModel::random(states, SYMBOLS, &mut rng).unwrap()
}

fn close_to_one(x: f64) -> bool {
    (x - 1.0).abs() < 1e-9
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn posteriors_are_normalized(
        obs in vec(0..SYMBOLS, 1..40),
        states in 1usize..5,
        seed in any::<u64>(),
    ) {
        let model = random_model(states, seed);
        let log_model = model.log_view();
        let f = forward(&log_model, &obs, false).unwrap();
        let b = backward(&log_model, &obs, &f, false).unwrap();
        let post = posteriors(&log_model, &obs, &f, &b).unwrap();

        prop_assert!(f.log_likelihood().is_finite());
        for row in post.gamma.row_iter() {
            let mass: f64 = row.iter().map(|g| g.exp()).sum();
            prop_assert!(close_to_one(mass), "gamma row sums to {}", mass);
        }
        prop_assert_eq!(post.xi.len(), obs.len() - 1);
        for slice in &post.xi {
            let mass: f64 = slice.iter().map(|x| x.exp()).sum();
            prop_assert!(close_to_one(mass), "xi slice sums to {}", mass);
        }
    }

    #[test]
    fn reestimated_model_is_stochastic(
        obs in vec(0..SYMBOLS, 1..40),
        states in 1usize..5,
        seed in any::<u64>(),
    ) {
        let model = random_model(states, seed);
        let log_model = model.log_view();
        let f = forward(&log_model, &obs, false).unwrap();
        let b = backward(&log_model, &obs, &f, false).unwrap();
        let post = posteriors(&log_model, &obs, &f, &b).unwrap();
        let step = reestimate(&model, &obs, &post, DegenerateRowPolicy::RetainPrevious).unwrap();

        prop_assert!(close_to_one(step.model.initial().sum()));
        for row in step.model.transition().row_iter().chain(step.model.emission().row_iter()) {
            prop_assert!(close_to_one(row.sum()), "row sums to {}", row.sum());
            prop_assert!(row.iter().all(|p| (0.0..=1.0 + 1e-12).contains(p)));
        }
    }

    #[test]
    fn fan_out_matches_serial(
        obs in vec(0..SYMBOLS, 1..30),
        states in 1usize..6,
        seed in any::<u64>(),
    ) {
        let log_model = random_model(states, seed).log_view();
        let serial = forward(&log_model, &obs, false).unwrap();
        let fanned = forward(&log_model, &obs, true).unwrap();
        prop_assert_eq!(&serial.log_alpha, &fanned.log_alpha);
        prop_assert_eq!(&serial.log_scale, &fanned.log_scale);

        let serial_beta = backward(&log_model, &obs, &serial, false).unwrap();
        let fanned_beta = backward(&log_model, &obs, &serial, true).unwrap();
        prop_assert_eq!(serial_beta.log_beta, fanned_beta.log_beta);
    }

    #[test]
    fn encoding_round_trips(text in "[ACGT]{1,64}") {
        let sequence: Vec<char> = text.chars().collect();
        let alphabet = Alphabet::from_sequence(&sequence).unwrap();
        let encoded = alphabet.encode(&sequence).unwrap();
        prop_assert!(encoded.iter().all(|&i| i < alphabet.len()));
        prop_assert_eq!(alphabet.decode(&encoded).unwrap(), sequence);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn fitted_history_never_decreases(
        text in "[ABC]{1,30}",
        states in 1usize..4,
        seed in any::<u64>(),
    ) {
        let sequence: Vec<char> = text.chars().collect();
        let config = EmConfig::default().with_seed(seed).with_max_iterations(200);
        let fitted = hanzo_baum_welch::estimate(&sequence, states, &config).unwrap();
        let history = &fitted.fit.history;

        prop_assert!(history.iter().all(|ll| ll.is_finite() && *ll <= 1e-9));
        for pair in history.windows(2) {
            prop_assert!(pair[1] >= pair[0]);
        }
        prop_assert_eq!(history.last().copied(), Some(fitted.log_likelihood()));
        prop_assert_eq!(history.len(), match fitted.fit.stop_reason {
            hanzo_baum_welch::StopReason::LikelihoodDecreased => fitted.fit.iterations,
            _ => fitted.fit.iterations + 1,
        });
    }

    #[test]
    fn seeded_fits_are_reproducible(text in "[XYZ]{2,20}", seed in any::<u64>()) {
        let sequence: Vec<char> = text.chars().collect();
        let config = EmConfig::default().with_seed(seed).with_max_iterations(25);
        let first = hanzo_baum_welch::estimate(&sequence, 2, &config).unwrap();
        let second = hanzo_baum_welch::estimate(&sequence, 2, &config).unwrap();
        prop_assert_eq!(first.fit.model, second.fit.model);
        prop_assert_eq!(first.fit.history, second.fit.history);
    }
}
