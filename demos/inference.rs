//! Provides an example of how to use bnet to perform inference on a Bayesian Network.

#[macro_use]
extern crate ndarray;

use bnet as b;
use b::graph::node_set;
use b::inference::{
    BayesNetInference, InferenceConfig, JunctionTreeInference, PosteriorProvider, VariableElimination
};
use b::init::Initialization;

fn main() -> b::Result<()> {

    /////////////////////////////////////////////////////
    // Step 1: Build Model
    let bn = build_model()?;
    let d = bn.id_from_name("D")?;
    let i = bn.id_from_name("I")?;
    let g = bn.id_from_name("G")?;
    let s = bn.id_from_name("S")?;
    let l = bn.id_from_name("L")?;

    /////////////////////////////////////////////////////
    // Step 2: Build the inference engines
    let config = InferenceConfig::default().with_num_threads(2);
    let mut jt = JunctionTreeInference::with_config(&bn, config);
    let mut ve = VariableElimination::new(&bn);

    /////////////////////////////////////////////////////
    // Step 3: Enter some evidence
    observe(&mut jt, d, s, l)?;
    observe(&mut ve, d, s, l)?;

    /////////////////////////////////////////////////////
    // Step 4: Run a Conditional Query
    let p = jt.posterior(i)?;
    for (k, value) in p.values().iter().enumerate() {
        println!("P(I = {} | D = 0, S = 0, L = 1) = {:.4}", k, value);
    }
    println!("H(I | D = 0, S = 0, L = 1) = {:.4} bits", jt.entropy(i)?);
    println!("P(D = 0, S = 0, L = 1) = {:.4}", ve.evidence_probability()?);
    println!("P(G | e) = {}", ve.posterior(g)?);

    /////////////////////////////////////////////////////
    // Step 5: Soft evidence on the grade
    jt.add_likelihood(g, &[0.6, 0.3, 0.1])?;
    println!("P(I | e, likelihood on G) = {}", jt.posterior(i)?);

    /////////////////////////////////////////////////////
    // Step 6: How the letter depends on the student
    let impact = jt.evidence_impact(l, &node_set(vec![d, i]))?;
    println!("P(L | D, I) = {}", impact);

    Ok(())
}

/// D = 0, S = 0, L = 1
fn observe(engine: &mut dyn BayesNetInference, d: b::NodeId, s: b::NodeId, l: b::NodeId) -> b::Result<()> {
    engine.add_evidence(d, 0)?;
    engine.add_evidence(s, 0)?;
    engine.add_evidence(l, 1)
}

fn build_model() -> b::Result<b::BayesNet> {
    let d = b::Variable::binary("D");
    let i = b::Variable::binary("I");
    let g = b::Variable::discrete("G", 3);
    let s = b::Variable::binary("S");
    let l = b::Variable::binary("L");

    ///////////////////////////////////////////////////
    // CPTs for variables with parents
    let cpt_g = b::Potential::from_table(
        vec![i.clone(), d.clone(), g.clone()],
        array![
            [[0.3, 0.4, 0.3], [0.05, 0.25, 0.7]],
            [[0.9, 0.08, 0.02], [0.5, 0.3, 0.2]]
        ].into_dyn()
    )?;

    let cpt_s = b::Potential::from_table(
        vec![i.clone(), s.clone()],
        array![
            [0.95, 0.05],
            [0.2, 0.8]
        ].into_dyn()
    )?;

    let cpt_l = b::Potential::from_table(
        vec![g.clone(), l.clone()],
        array![
            [0.1, 0.9],
            [0.4, 0.6],
            [0.99, 0.01]
        ].into_dyn()
    )?;

    b::BayesNetBuilder::new()
        .with_variable(&d, &[], Initialization::Binomial(0.6))
        .with_variable(&i, &[], Initialization::Binomial(0.7))
        .with_variable(&g, &[i.clone(), d.clone()], Initialization::Table(cpt_g))
        .with_variable(&s, &[i.clone()], Initialization::Table(cpt_s))
        .with_variable(&l, &[g.clone()], Initialization::Table(cpt_l))
        .build()
}
