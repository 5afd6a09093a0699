//! List all connected Kinect v2 sensors.

fn main() {
    env_logger::init();

    match kinect2::device::list_sensors() {
        Ok(sensors) if sensors.is_empty() => {
            eprintln!("{}", kinect2::Kinect2Error::SensorNotFound);
            std::process::exit(1);
        }
        Ok(sensors) => {
            println!("Found {} Kinect v2 sensor(s):", sensors.len());
            for (i, sensor) in sensors.iter().enumerate() {
                println!(
                    "  [{}] PID={:04X}  Bus={} Addr={}",
                    i, sensor.product_id, sensor.bus_number, sensor.address
                );
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
