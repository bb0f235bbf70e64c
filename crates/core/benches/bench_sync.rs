// Benchmarks for the hot paths a host hits every tick: rate remapping,
// buffer writes and lookups, and one calibration step over a source group.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use framelock_core::{
    CalibrationConfig, Calibrator, FrameRate, FrameTime, FrameTimeWithRate, SharedDataSource,
    SharedTimecodeSource, SourceId, SynchronizerId, TimecodeSource, TimedDataBuffer,
    TimedDataSource, TimedSampleStatus,
};
use std::cell::RefCell;
use std::rc::Rc;

struct BenchSource {
    id: SourceId,
    rate: FrameRate,
    buffer: TimedDataBuffer<u64>,
    offset: FrameTime,
    synchronized: bool,
    owner: Option<SynchronizerId>,
}

impl BenchSource {
    fn shared(rate: FrameRate, newest: i32) -> SharedDataSource {
        let mut buffer = TimedDataBuffer::with_capacity(rate, 16);
        for frame in (newest - 15)..=newest {
            buffer.add_in_rate(FrameTime::new(frame), frame as u64);
        }
        Rc::new(RefCell::new(BenchSource {
            id: SourceId::new(),
            rate,
            buffer,
            offset: FrameTime::default(),
            synchronized: true,
            owner: None,
        }))
    }
}

impl TimedDataSource for BenchSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn display_name(&self) -> &str {
        "bench source"
    }

    fn frame_rate(&self) -> FrameRate {
        self.rate
    }

    fn buffer_size(&self) -> usize {
        self.buffer.capacity()
    }

    fn set_buffer_size(&mut self, size: usize) {
        self.buffer.set_capacity(size);
    }

    fn presentation_offset(&self) -> FrameTime {
        self.offset
    }

    fn set_presentation_offset(&mut self, offset: FrameTime) {
        self.offset = offset;
    }

    fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    fn set_synchronized(&mut self, synchronized: bool) {
        self.synchronized = synchronized;
    }

    fn synchronizer(&self) -> Option<SynchronizerId> {
        self.owner
    }

    fn set_synchronizer(&mut self, synchronizer: Option<SynchronizerId>) {
        self.owner = synchronizer;
    }

    fn buffer_range(&self) -> Option<(FrameTime, FrameTime)> {
        self.buffer.frame_range()
    }

    fn present_at(&mut self, present_time: &FrameTimeWithRate) -> TimedSampleStatus {
        let local = present_time.remap(self.rate);
        self.buffer.try_get_sample(local.time).0
    }
}

struct BenchClock {
    id: SourceId,
    rate: FrameRate,
    time: FrameTime,
}

impl TimecodeSource for BenchClock {
    fn id(&self) -> SourceId {
        self.id
    }

    fn display_name(&self) -> &str {
        "bench clock"
    }

    fn frame_rate(&self) -> FrameRate {
        self.rate
    }

    fn current_time(&self) -> Option<FrameTimeWithRate> {
        Some(FrameTimeWithRate::new(self.time, self.rate))
    }
}

fn bench_remap(c: &mut Criterion) {
    let film = FrameRate::new(24, 1);
    let ntsc = FrameRate::with_drop_frame(30000, 1001, true);
    let time = FrameTime::from_f64(86_400.5);

    c.bench_function("remap_film_to_ntsc", |b| {
        b.iter(|| black_box(FrameTime::remap(black_box(time), film, ntsc)))
    });
}

fn bench_buffer(c: &mut Criterion) {
    let rate = FrameRate::new(60, 1);
    let mut group = c.benchmark_group("timed_buffer");

    group.bench_function("add_at_capacity", |b| {
        let mut buffer = TimedDataBuffer::with_capacity(rate, 64);
        let mut frame = 0i32;
        b.iter(|| {
            frame = frame.wrapping_add(1);
            black_box(buffer.add_in_rate(FrameTime::new(frame), frame));
        });
    });

    group.bench_function("nearest_query", |b| {
        let mut buffer = TimedDataBuffer::with_capacity(rate, 64);
        for frame in 0..64 {
            buffer.add_in_rate(FrameTime::new(frame), frame);
        }
        let request = FrameTime::from_f64(31.4);
        b.iter(|| black_box(buffer.try_get_sample(black_box(request))));
    });

    group.finish();
}

fn bench_calibration_step(c: &mut Criterion) {
    let rate = FrameRate::new(30, 1);
    let sources: Vec<SharedDataSource> = (0..8)
        .map(|index| BenchSource::shared(rate, 100 - index))
        .collect();
    let clock: SharedTimecodeSource = Rc::new(RefCell::new(BenchClock {
        id: SourceId::new(),
        rate,
        time: FrameTime::new(105),
    }));

    let config = CalibrationConfig {
        required_good_samples: u32::MAX,
        step_budget: None,
        ..CalibrationConfig::default()
    };
    let mut calibrator = Calibrator::new(config, Some(clock), sources);
    calibrator.step(); // cluster selection, leaves the run in the delay phase

    c.bench_function("calibration_delay_step", |b| {
        b.iter(|| black_box(calibrator.step()))
    });
}

criterion_group!(
    benches,
    bench_remap,
    bench_buffer,
    bench_calibration_step
);
criterion_main!(benches);
