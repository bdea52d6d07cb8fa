//! BanditPAM, naive PAM, and FastPAM1 on a simple 2D dataset.

use medoids::cluster::{Algorithm, KMedoids};

fn main() {
    // Three well-separated clusters in 2D, with one outlier.
    let data: Vec<Vec<f64>> = vec![
        // Cluster A (near origin)
        vec![0.0, 0.0],
        vec![0.1, 0.2],
        vec![0.2, 0.1],
        vec![-0.1, 0.1],
        // Cluster B (near (5, 5))
        vec![5.0, 5.0],
        vec![5.1, 4.9],
        vec![4.9, 5.1],
        vec![5.2, 5.2],
        // Cluster C (near (10, 0))
        vec![10.0, 0.0],
        vec![10.1, 0.1],
        vec![9.9, -0.1],
        vec![10.2, 0.2],
        // An outlier: a medoid never moves toward it.
        vec![30.0, 30.0],
    ];

    for algorithm in [Algorithm::BanditPam, Algorithm::Naive, Algorithm::FastPam1] {
        let fit = KMedoids::new(3)
            .with_algorithm(algorithm)
            .with_seed(42)
            .fit(&data, "L2")
            .unwrap();

        println!("=== {algorithm} (k=3) ===");
        println!(
            "  medoids {:?}, loss {:.3}, swap steps {}",
            fit.medoids_final, fit.loss, fit.steps
        );
        for (i, slot) in fit.assignments.iter().enumerate() {
            println!(
                "  point {:2} ({:5.1}, {:5.1}) => cluster {}",
                i, data[i][0], data[i][1], slot
            );
        }
        println!();
    }
}
