use rand::{rngs::SmallRng, SeedableRng};

/// Random source of an agent. The seed, when given, is a hyperparameter of
/// the agent and is persisted with it; the generator state is not. An agent
/// restored from a checkpoint therefore restarts the stream from the seed
/// and replays the draws of the original run instead of continuing them.
#[derive(Clone, Debug)]
pub struct MaybeSeededRng {
    seed: Option<u64>,
    rng: SmallRng,
}

impl MaybeSeededRng {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = if let Some(seed) = seed {
            SmallRng::seed_from_u64(seed)
        } else {
            SmallRng::from_os_rng()
        };

        Self { seed, rng }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn get_rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}
