//! Provides an example of how to use bnet to represent Bayesian Networks.
//!
//! This example is taken from Koller & Friedman Exercise 3.4

#[macro_use]
extern crate ndarray;

use bnet as b;
use b::init::Initialization;
use b::triangulation::Triangulation;

use std::collections::BTreeMap;

fn main() -> b::Result<()> {

    ///////////////////////////////////////////////////
    // Step 1: Define variables

    let difficulty = b::Variable::binary("D");
    let intelligence = b::Variable::binary("I");
    let grade = b::Variable::labelized("G", &["A", "B", "C"])?;
    let sat = b::Variable::binary("S");
    let letter = b::Variable::binary("L");

    ///////////////////////////////////////////////////
    // Step 2: Build CPTs for variables with parents
    let cpt_g = b::Potential::from_table(
        vec![intelligence.clone(), difficulty.clone(), grade.clone()],
        array![
            [[0.3, 0.4, 0.3], [0.05, 0.25, 0.7]],
            [[0.9, 0.08, 0.02], [0.5, 0.3, 0.2]]
        ].into_dyn()
    )?;

    let cpt_s = b::Potential::from_table(
        vec![intelligence.clone(), sat.clone()],
        array![
            [0.95, 0.05],
            [0.2, 0.8]
        ].into_dyn()
    )?;

    let cpt_l = b::Potential::from_table(
        vec![grade.clone(), letter.clone()],
        array![
            [0.1, 0.9],
            [0.4, 0.6],
            [0.99, 0.01]
        ].into_dyn()
    )?;

    ///////////////////////////////////////////////////
    // Step 3: Build the Model
    let bn = b::BayesNetBuilder::new()
        .with_variable(&difficulty, &[], Initialization::Binomial(0.6))
        .with_variable(&intelligence, &[], Initialization::Binomial(0.7))
        .with_variable(&grade, &[intelligence.clone(), difficulty.clone()], Initialization::Table(cpt_g))
        .with_variable(&sat, &[intelligence.clone()], Initialization::Table(cpt_s))
        .with_variable(&letter, &[grade.clone()], Initialization::Table(cpt_l))
        .build()?;

    println!("{:?}", bn);
    println!("free parameters: {}", bn.dim());

    ///////////////////////////////////////////////////
    // Step 4: Determine Probability of Instantiations
    let scope = vec![intelligence, difficulty, grade, sat, letter];

    let mut acc = 0.0;
    for inst in b::instantiation::all_instantiations(&scope) {
        let p = bn.probability(&inst)?;
        println!("P({}) = {:.4}", inst, p);
        acc += p;
    }

    println!("---------------------------------------------");
    println!("TOTAL: {:.4}", acc);

    ///////////////////////////////////////////////////
    // Step 5: The junction tree of the network
    let domain_sizes: BTreeMap<b::NodeId, usize> = bn
        .nodes()
        .map(|n| bn.variable(n).map(|v| (n, v.domain_size())))
        .collect::<b::Result<_>>()?;

    let mut triangulation = Triangulation::default();
    triangulation.set_graph(&bn.moral_graph(), &domain_sizes)?;
    println!("elimination order: {:?}", triangulation.elimination_order()?);

    let junction_tree = triangulation.junction_tree()?.clone();
    for (id, clique) in junction_tree.cliques() {
        let names = clique.iter().map(|&n| bn.name(n)).collect::<b::Result<Vec<_>>>()?;
        println!("clique {}: {:?}", id, names);
    }
    for (a, c) in junction_tree.edges() {
        println!("separator {} - {}: {:?}", a, c, junction_tree.separator(a, c)?);
    }

    Ok(())
}
