//! Provides an example of how to use bnet to estimate the parameters of a Bayesian Network from
//! sampled data, and to enumerate the structural changes a learner may try on it.

use bnet as b;
use b::estimators::{Apriori, Estimator, ParameterEstimator};
use b::init::Initialization;
use b::learning::{GeneratorConfig, GraphChangesGenerator, StructuralConstraintDag};
use b::samplers::ForwardSampler;

use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> b::Result<()> {
    let difficulty = b::Variable::binary("D");
    let intelligence = b::Variable::binary("I");
    let grade = b::Variable::discrete("G", 3);
    let sat = b::Variable::binary("S");
    let letter = b::Variable::binary("L");

    let scope = StudentVariables(difficulty, intelligence, grade, sat, letter);

    ////////////////////////////////////////////////////////////////////////////
    // Step 1:  Build Truth and Target Models
    //
    // Note:    the target model is initialized with incorrect parameters
    let truth = build_model(scope.clone(), ModelType::Truth)?;
    let target = build_model(scope.clone(), ModelType::Target)?;

    ////////////////////////////////////////////////////////////////////////////
    // Step 2:  Build dataset from truth
    //
    // Note:    this will generate samples from the truth distribution using
    //          forward sampling
    let sampler = ForwardSampler::new(&truth);
    let mut rng = StdRng::seed_from_u64(7);
    let num_samples = 10_000;
    let dataset = (0..num_samples).map(|_| sampler.sample_with(&mut rng)).collect::<b::Result<Vec<_>>>()?;

    ////////////////////////////////////////////////////////////////////////////
    // Step 3:  Estimate the model's parameters, with a little smoothing
    let mut estimator = ParameterEstimator::new(&target, Apriori::Smoothing(1.0))?;
    let estimated = estimator.estimate(dataset.iter())?;

    let StudentVariables(d, i, g, s, l) = scope;
    let scope = vec![i, d, g, s, l];

    let mut acc_truth = 0.0;
    let mut acc_prior = 0.0;
    let mut acc_posterior = 0.0;
    println!("                                   | Truth   | Before  | Estimated");
    println!("---------------------------------------------------------------------");
    for inst in b::instantiation::all_instantiations(&scope) {
        let p_truth = truth.probability(&inst)?;
        let p_prior = target.probability(&inst)?;
        let p_posterior = estimated.probability(&inst)?;

        println!("P({})\t| {:.4}  | {:.4}  | {:.4}", inst, p_truth, p_prior, p_posterior);

        acc_truth += p_truth;
        acc_prior += p_prior;
        acc_posterior += p_posterior;
    }

    println!("---------------------------------------------------------------------");
    println!("TOTAL:\t\t\t\t   | {:.4}  | {:.4}  | {:.4}", acc_truth, acc_prior, acc_posterior);

    ////////////////////////////////////////////////////////////////////////////
    // Step 4:  The single-arc changes a structure search could try next
    let constraints = StructuralConstraintDag::from_dag(estimated.dag()).with_max_parents(2);
    let mut generator = GraphChangesGenerator::new(GeneratorConfig::default().with_num_threads(2));
    generator.set_graph(&constraints)?;

    println!("{} candidate changes:", generator.len());
    for change in generator.changes() {
        println!("  {}", change);
    }

    Ok(())
}

enum ModelType {
    Truth,
    Target
}

#[derive(Clone)]
struct StudentVariables(b::Variable, b::Variable, b::Variable, b::Variable, b::Variable);

fn build_model(vars: StudentVariables, mtype: ModelType) -> b::Result<b::BayesNet> {
    let StudentVariables(d, i, g, s, l) = vars;

    let cpt_g = b::Potential::from_values(
        vec![i.clone(), d.clone(), g.clone()],
        vec![0.3, 0.4, 0.3, 0.05, 0.25, 0.7, 0.9, 0.08, 0.02, 0.5, 0.3, 0.2]
    )?;
    let cpt_s = b::Potential::from_values(vec![i.clone(), s.clone()], vec![0.95, 0.05, 0.2, 0.8])?;
    let cpt_l = b::Potential::from_values(vec![g.clone(), l.clone()], vec![0.1, 0.9, 0.4, 0.6, 0.99, 0.01])?;

    let (init_d, init_i, init_g, init_s, init_l) = match mtype {
        ModelType::Truth => (
            Initialization::Binomial(0.6),
            Initialization::Binomial(0.7),
            Initialization::Table(cpt_g),
            Initialization::Table(cpt_s),
            Initialization::Table(cpt_l)
        ),
        ModelType::Target => (
            Initialization::Uniform,
            Initialization::Uniform,
            Initialization::Uniform,
            Initialization::Uniform,
            Initialization::Uniform
        )
    };

    b::BayesNetBuilder::new()
        .with_variable(&d, &[], init_d)
        .with_variable(&i, &[], init_i)
        .with_variable(&g, &[i.clone(), d.clone()], init_g)
        .with_variable(&s, &[i.clone()], init_s)
        .with_variable(&l, &[g.clone()], init_l)
        .build()
}
