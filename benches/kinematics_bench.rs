// Benchmarks for inverse kinematics and full move dispatch
// Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use cnc_kinematics::alarm::AlarmLog;
use cnc_kinematics::motion::kinematics::{SingleArmScaraKinematics, WallPlotterKinematics};
use cnc_kinematics::motion::{
    CartesianPoint, KinematicsContext, KinematicsModel, MotionDispatcher, MotionRequest, QueuedPlanner, RootSelection,
    Validator,
};

fn plotter() -> WallPlotterKinematics {
    WallPlotterKinematics::new([-267.0, 250.0], [267.0, 250.0], RootSelection::Below).unwrap()
}

fn bench_inverse_kinematics(c: &mut Criterion) {
    let model = plotter();
    let points: Vec<_> = (0..1000)
        .map(|i| CartesianPoint::new((i % 400) as f64 - 200.0, -((i % 300) as f64), 0.0))
        .collect();
    c.bench_function("wall plotter inverse 1k points", |b| {
        b.iter(|| {
            for p in &points {
                black_box(model.inverse_kinematics(black_box(p)));
            }
        });
    });
}

fn bench_forward_kinematics(c: &mut Criterion) {
    let model = plotter();
    let lengths = model.inverse_kinematics(&CartesianPoint::new(35.0, -120.0, 0.0));
    c.bench_function("wall plotter forward", |b| {
        b.iter(|| model.forward_kinematics(black_box(&lengths)).unwrap());
    });
}

fn bench_scara_round_trip(c: &mut Criterion) {
    let model = SingleArmScaraKinematics::new(65.0, 50.0, true).unwrap().with_min_reach(20.0);
    let p = CartesianPoint::new(40.0, 70.0, 0.0);
    c.bench_function("scara inverse + forward", |b| {
        b.iter(|| model.forward_kinematics(&model.inverse_kinematics(black_box(&p))).unwrap());
    });
}

fn bench_dispatch(c: &mut Criterion) {
    for (name, validate) in [("dispatch 500mm move", false), ("dispatch 500mm move, validated", true)] {
        let context = KinematicsContext::new(Box::new(plotter()), None);
        let validator = validate.then(Validator::default);
        let mut dispatcher = MotionDispatcher::new(context, 1.0, validator, QueuedPlanner::with_capacity(512), AlarmLog::new()).unwrap();
        dispatcher.calibrate(CartesianPoint::ORIGIN).unwrap();
        let out = MotionRequest::linear(CartesianPoint::new(-250.0, -100.0, 0.0), CartesianPoint::new(250.0, -100.0, 0.0), 3000.0);
        c.bench_function(name, |b| {
            b.iter(|| {
                let result = dispatcher.convert_motion(black_box(&out)).unwrap();
                dispatcher.planner_mut().clear_queue();
                result
            });
        });
    }
}

criterion_group!(benches, bench_inverse_kinematics, bench_forward_kinematics, bench_scara_round_trip, bench_dispatch);
criterion_main!(benches);
