use rand::rngs::StdRng;
use rand::SeedableRng as _;
use rand::Rng;

pub(crate) fn random_number_generator(seed: Option<u64>) -> StdRng {
    let seed = if let Some(seed) = seed {
        seed
    } else {
        let mut seeder = StdRng::from_entropy();
        seeder.gen::<u64>()
    };
    StdRng::seed_from_u64(seed)
}
