use brain_nn::{Network, NetworkOptions, StateHook, TrainingDatum, TrainingOptions};

fn main() -> brain_nn::Result<()> {
    env_logger::init();

    let mut network = Network::new(NetworkOptions::hidden(vec![3]));

    let data = vec![
        TrainingDatum::new(vec![0.0, 0.0], vec![0.0]),
        TrainingDatum::new(vec![0.0, 1.0], vec![1.0]),
        TrainingDatum::new(vec![1.0, 0.0], vec![1.0]),
        TrainingDatum::new(vec![1.0, 1.0], vec![0.0]),
    ];

    let options = TrainingOptions {
        callback_period: 1000,
        callback: Some(StateHook::new(|state| println!("{state}"))),
        ..Default::default()
    };

    let state = network.train(&data, options)?;
    println!("Stopped: {:?} after {} iterations (error {:.6})", state.status, state.iterations, state.error);

    for datum in &data {
        println!("Input: {:?} -> Output: {:.4}", datum.input, network.run(&datum.input)?[0]);
    }

    let export = network.export()?;
    println!("{}", serde_json::to_string_pretty(&export)?);
    Ok(())
}
