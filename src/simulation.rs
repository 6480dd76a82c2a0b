use crate::heading::{new_heading, HeadingNoise};
use crate::integrator::advance;
use crate::neighbors::NeighborQuery;
use crate::sink::FrameSink;
use crate::state::ParticleState;
use log::{debug, info, trace};
use rand::distr::Uniform;
use rand::prelude::*;
use rayon::prelude::*;
use vicsek_common::{Error, Result, SimParams, SimulationConfig, Snapshot};

/// Manages the state and execution of the flocking simulation.
pub struct VicsekSimulation {
    config: SimulationConfig,
    params: SimParams,
    /// The flock, exclusively owned by the simulation.
    state: ParticleState,
    /// Shared noise stream, consumed in particle-index order by the serial update.
    rng: StdRng,
    /// Seed the run was started with. Parallel updates derive per-particle streams from it.
    seed: u64,
    /// Number of completed steps.
    current_time_step: u32,
    neighbor_query: NeighborQuery,
    noise: HeadingNoise,
    /// Mean neighbor-set size observed during the last step.
    last_mean_neighbor_count: f64,
}

impl VicsekSimulation {
    /// Validates the configuration and places the initial flock: uniform
    /// positions over the domain, uniform headings in `[-eta, eta]`.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let seed = match config.initial_conditions.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::rng().random();
                info!("No seed configured, using random seed {}", seed);
                seed
            }
        };
        let mut rng = StdRng::seed_from_u64(seed);
        let params = config.get_sim_params();

        let (xs, ys, headings) = place_initial_particles(&params, &mut rng)?;
        let state = ParticleState::new(&xs, &ys, &headings, &params)?;
        info!("Placed {} particles with seed {}", state.len(), seed);

        Self::assemble(config, params, state, rng, seed)
    }

    /// Starts from an explicit flock instead of a random placement.
    ///
    /// `num_particles` in the configuration is replaced by the length of the
    /// supplied slices; the positions must lie inside the domain.
    pub fn from_state(
        mut config: SimulationConfig,
        xs: &[f64],
        ys: &[f64],
        headings: &[f64],
        seed: u64,
    ) -> Result<Self> {
        config.flock.num_particles = u32::try_from(xs.len()).map_err(|_| {
            Error::InvalidConfig(format!("{} particles exceed the supported count", xs.len()))
        })?;
        config.validate()?;
        let params = config.get_sim_params();
        let state = ParticleState::new(xs, ys, headings, &params)?;
        Self::assemble(config, params, state, StdRng::seed_from_u64(seed), seed)
    }

    fn assemble(
        config: SimulationConfig,
        params: SimParams,
        state: ParticleState,
        rng: StdRng,
        seed: u64,
    ) -> Result<Self> {
        let neighbor_query = NeighborQuery::new(config.execution.neighbor_search, &params);
        let noise = HeadingNoise::new(params.eta)?;
        debug!(
            "Neighbor search: {:?}, parallel update: {}",
            config.execution.neighbor_search, config.execution.parallel
        );
        Ok(Self {
            config,
            params,
            state,
            rng,
            seed,
            current_time_step: 0,
            neighbor_query,
            noise,
            last_mean_neighbor_count: 0.0,
        })
    }

    /// Advances the flock by one synchronous step.
    ///
    /// Every particle reads the frozen state of the previous step: neighbors,
    /// then the new heading, then the move along that heading with wraparound.
    pub fn step(&mut self) -> Result<()> {
        self.state.check_invariants()?;

        // --- 1. Index the frozen state ---
        self.neighbor_query.prepare(&self.state, &self.params)?;

        // --- 2. Heading + motion for every particle (_in -> _out) ---
        let total_neighbors = if self.config.execution.parallel {
            self.update_parallel()?
        } else {
            self.update_serial()?
        };
        self.last_mean_neighbor_count = total_neighbors as f64 / self.state.len() as f64;

        // --- 3. Publish the new state ---
        self.state.swap_buffers();
        self.current_time_step += 1;

        trace!(
            "Step {} done, mean neighbors {:.2}",
            self.current_time_step,
            self.last_mean_neighbor_count
        );
        Ok(())
    }

    /// Serial update drawing noise from the shared stream in particle-index order.
    /// Returns the summed neighbor-set sizes.
    fn update_serial(&mut self) -> Result<usize> {
        let params = &self.params;
        let state = &mut self.state;
        let mut neighbors = Vec::new();
        let mut total_neighbors = 0;

        for idx in 0..state.len() {
            self.neighbor_query.collect(
                idx,
                &state.positions_x_in,
                &state.positions_y_in,
                params,
                &mut neighbors,
            );
            total_neighbors += neighbors.len();

            let heading = new_heading(&state.headings_in, &neighbors, &self.noise, &mut self.rng)
                .map_err(|e| with_particle(e, idx))?;
            let (x, y) = advance(
                state.positions_x_in[idx],
                state.positions_y_in[idx],
                heading,
                params.speed,
                params.world_width,
                params.world_height,
            );
            state.positions_x_out[idx] = x;
            state.positions_y_out[idx] = y;
            state.headings_out[idx] = heading;
        }
        Ok(total_neighbors)
    }

    /// Parallel update with one independent noise stream per particle and step.
    fn update_parallel(&mut self) -> Result<usize> {
        let params = &self.params;
        let query = &self.neighbor_query;
        let noise = &self.noise;
        let seed = self.seed;
        let time_step = self.current_time_step;
        let state = &mut self.state;

        // Immutable views of the frozen state for the parallel closure.
        let pos_x_in_slice = &state.positions_x_in;
        let pos_y_in_slice = &state.positions_y_in;
        let headings_in_slice = &state.headings_in;

        state.positions_x_out
            .par_iter_mut()
            .zip(state.positions_y_out.par_iter_mut())
            .zip(state.headings_out.par_iter_mut())
            .enumerate()
            .map_init(Vec::new, |neighbors, (idx, ((pos_x_out, pos_y_out), heading_out))| {
                let mut rng = particle_rng(seed, time_step, idx);
                query.collect(idx, pos_x_in_slice, pos_y_in_slice, params, neighbors);

                let heading = new_heading(headings_in_slice, &neighbors[..], noise, &mut rng)
                    .map_err(|e| with_particle(e, idx))?;
                let (x, y) = advance(
                    pos_x_in_slice[idx],
                    pos_y_in_slice[idx],
                    heading,
                    params.speed,
                    params.world_width,
                    params.world_height,
                );
                *pos_x_out = x;
                *pos_y_out = y;
                *heading_out = heading;
                Ok::<usize, Error>(neighbors.len())
            })
            .try_reduce(|| 0, |a, b| Ok(a + b))
    }

    /// Runs every remaining step, handing each new state to `sink`, then finishes the sink.
    pub fn run_with_sink<S: FrameSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        while self.remaining_steps() > 0 {
            self.step()?;
            sink.accept(&self.snapshot())?;
        }
        sink.finish()
    }

    /// Consumes the simulation into a lazy sequence of its remaining steps.
    pub fn into_steps(self) -> Steps {
        Steps { sim: self, failed: false }
    }

    /// The current state as a snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let headings = self.state.headings();
        Snapshot {
            step: self.current_time_step,
            particle_count: self.state.len() as u32,
            order_parameter: order_parameter(headings),
            mean_neighbor_count: self.last_mean_neighbor_count,
            positions: self.state.positions(),
            headings: self
                .config
                .output
                .save_headings_in_snapshot
                .then(|| headings.to_vec()),
        }
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> &ParticleState {
        &self.state
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn current_time_step(&self) -> u32 {
        self.current_time_step
    }

    pub fn current_particle_count(&self) -> usize {
        self.state.len()
    }

    pub fn remaining_steps(&self) -> u32 {
        self.config.timing.total_steps.saturating_sub(self.current_time_step)
    }

    /// Final `(x, y)` of every particle.
    pub fn get_results(&self) -> Vec<(f64, f64)> {
        self.state.positions()
    }
}

/// Lazy, finite sequence of per-step snapshots. Yields exactly `total_steps`
/// items (fewer only if a step fails, in which case the error is the last item).
pub struct Steps {
    sim: VicsekSimulation,
    failed: bool,
}

impl Steps {
    /// The simulation behind the iterator, e.g. to take the initial snapshot.
    pub fn simulation(&self) -> &VicsekSimulation {
        &self.sim
    }
}

impl Iterator for Steps {
    type Item = Result<Snapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.sim.remaining_steps() == 0 {
            return None;
        }
        match self.sim.step() {
            Ok(()) => Some(Ok(self.sim.snapshot())),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.failed { 0 } else { self.sim.remaining_steps() as usize };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Steps {}

/// Validates `config`, places the initial flock and returns its steps as a lazy sequence.
pub fn run(config: SimulationConfig) -> Result<Steps> {
    Ok(VicsekSimulation::new(config)?.into_steps())
}

/// Polar order parameter `|sum(cos θ, sin θ)| / N`.
pub fn order_parameter(headings: &[f64]) -> f64 {
    if headings.is_empty() {
        return 0.0;
    }
    let (sum_cos, sum_sin) = headings
        .iter()
        .fold((0.0, 0.0), |(c, s), h| (c + h.cos(), s + h.sin()));
    (sum_cos * sum_cos + sum_sin * sum_sin).sqrt() / headings.len() as f64
}

/// Independent noise stream for one particle at one step.
fn particle_rng(seed: u64, time_step: u32, particle_idx: usize) -> StdRng {
    let stream = seed
        ^ (time_step as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (particle_idx as u64).wrapping_add(1).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    StdRng::seed_from_u64(stream)
}

fn with_particle(err: Error, particle_idx: usize) -> Error {
    match err {
        Error::InvalidState(msg) => Error::InvalidState(format!("particle {}: {}", particle_idx, msg)),
        other => other,
    }
}

/// Uniform random placement: all x, then all y, then all headings from one stream.
fn place_initial_particles(params: &SimParams, rng: &mut StdRng) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    let n = params.num_particles as usize;
    let dist_x = Uniform::new(0.0, params.world_width)
        .map_err(|e| Error::InvalidConfig(format!("universe.width: {}", e)))?;
    let dist_y = Uniform::new(0.0, params.world_height)
        .map_err(|e| Error::InvalidConfig(format!("universe.height: {}", e)))?;
    let heading_dist = HeadingNoise::new(params.eta)?;

    let xs: Vec<f64> = (0..n).map(|_| rng.sample(&dist_x)).collect();
    let ys: Vec<f64> = (0..n).map(|_| rng.sample(&dist_y)).collect();
    let headings: Vec<f64> = (0..n).map(|_| heading_dist.sample(rng)).collect();
    Ok((xs, ys, headings))
}
