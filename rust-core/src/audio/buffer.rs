//! Fixed-size block assembly for captured audio
//!
//! The platform callback hands over interleaved chunks of whatever size the
//! backend chooses. The assembler keeps the first channel in a lock-free ring
//! buffer and releases it in blocks of exactly `block_size` samples.

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

/// Mono block assembler backed by a ring buffer
pub struct BlockAssembler {
    producer: HeapProducer<f64>,
    consumer: HeapConsumer<f64>,

    /// Reused storage for the block handed to the sink
    block: Vec<f64>,
}

impl BlockAssembler {
    /// Create an assembler emitting blocks of `block_size` samples
    pub fn new(block_size: usize) -> Self {
        let block_size = block_size.max(1);

        // Two blocks of headroom: after draining, a full chunk always fits
        let rb = HeapRb::<f64>::new(2 * block_size);
        let (producer, consumer) = rb.split();

        Self {
            producer,
            consumer,
            block: vec![0.0; block_size],
        }
    }

    /// Push interleaved samples, keeping channel 0
    ///
    /// Calls `on_block` once per completed block, in capture order.
    pub fn push_interleaved<F>(&mut self, data: &[f32], channels: usize, mut on_block: F)
    where
        F: FnMut(&[f64]),
    {
        let channels = channels.max(1);
        let block_size = self.block.len();

        for chunk in data.chunks(block_size * channels) {
            self.producer
                .push_iter(&mut chunk.iter().step_by(channels).map(|&s| f64::from(s)));

            while self.consumer.len() >= block_size {
                self.consumer.pop_slice(&mut self.block);
                on_block(&self.block);
            }
        }
    }

    /// Samples waiting for the next block
    pub fn pending(&self) -> usize {
        self.consumer.len()
    }

    /// Drop any partially assembled block
    pub fn clear(&mut self) {
        self.consumer.clear();
    }

    pub fn block_size(&self) -> usize {
        self.block.len()
    }
}
