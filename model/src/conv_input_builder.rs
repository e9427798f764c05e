/// Writes channel-last (`[height, width, channel]`) input planes into a flat buffer.
pub struct ConvInputBuilder<'input> {
    channel_size: usize,
    num_channels: usize,
    input: &'input mut [f32],
}

impl<'input> ConvInputBuilder<'input> {
    pub fn new(channel_size: usize, input: &mut [f32]) -> ConvInputBuilder<'_> {
        assert_eq!(input.len() % channel_size, 0);

        let num_channels = input.len() / channel_size;

        ConvInputBuilder {
            channel_size,
            num_channels,
            input,
        }
    }

    pub fn channel<'b>(&'b mut self, channel: usize) -> ChannelBuilder<'b, 'input> {
        assert!(
            channel < self.num_channels,
            "Cannot write to the provided channel: {} as it is out of range of the number of channels: {}",
            channel,
            self.num_channels
        );

        ChannelBuilder {
            channel,
            channel_size: self.channel_size,
            input_builder: self,
        }
    }
}

pub struct ChannelBuilder<'builder, 'input> {
    channel: usize,
    channel_size: usize,
    input_builder: &'builder mut ConvInputBuilder<'input>,
}

impl ChannelBuilder<'_, '_> {
    pub fn fill(&mut self, value: f32) {
        for index in 0..self.input_builder.channel_size {
            self.write_at_idx(index, value)
        }
    }

    pub fn write_at_idx(&mut self, index: usize, value: f32) {
        assert!(
            index < self.channel_size,
            "Cannot write to the provided index: {} as it is out of range of the channel: {}",
            index,
            self.channel_size
        );

        let input_idx = self.channel + (self.input_builder.num_channels * index);
        self.input_builder.input[input_idx] = value;
    }
}

#[cfg(test)]
mod test {

    use crate::ConvInputBuilder;

    #[test]
    fn test_fill() {
        const CHANNEL_SIZE: usize = 64;
        const NUM_CHANNELS: usize = 4;
        let mut input = [0.0; CHANNEL_SIZE * NUM_CHANNELS];
        let mut builder = ConvInputBuilder::new(CHANNEL_SIZE, &mut input);
        builder.channel(0).fill(1.0);
        builder.channel(1).fill(-1.0);

        for (idx, val) in input.into_iter().enumerate() {
            if idx % NUM_CHANNELS == 0 {
                assert_eq!(val, 1.0);
            } else if idx % NUM_CHANNELS == 1 {
                assert_eq!(val, -1.0);
            } else {
                assert_eq!(val, 0.0);
            }
        }
    }

    #[test]
    fn test_write_at_idx() {
        const CHANNEL_SIZE: usize = 64;
        const NUM_CHANNELS: usize = 4;
        let mut input = [0.0; CHANNEL_SIZE * NUM_CHANNELS];
        let mut builder = ConvInputBuilder::new(CHANNEL_SIZE, &mut input);
        builder.channel(0).write_at_idx(0, 1.0);
        builder.channel(0).write_at_idx(1, 2.0);
        builder.channel(0).write_at_idx(2, 3.0);
        builder.channel(1).write_at_idx(0, 4.0);
        builder.channel(1).write_at_idx(1, 5.0);
        builder.channel(1).write_at_idx(2, 6.0);

        assert_eq!(input[0], 1.0);
        assert_eq!(input[NUM_CHANNELS], 2.0);
        assert_eq!(input[NUM_CHANNELS * 2], 3.0);
        assert_eq!(input[1], 4.0);
        assert_eq!(input[NUM_CHANNELS + 1], 5.0);
        assert_eq!(input[NUM_CHANNELS * 2 + 1], 6.0);
    }

    #[test]
    #[should_panic(
        expected = "Cannot write to the provided index: 64 as it is out of range of the channel: 64"
    )]
    fn panics_when_writing_to_invalid_idx() {
        const CHANNEL_SIZE: usize = 64;
        const NUM_CHANNELS: usize = 4;
        let mut input = [0.0; CHANNEL_SIZE * NUM_CHANNELS];
        let mut builder = ConvInputBuilder::new(CHANNEL_SIZE, &mut input);

        builder.channel(1).write_at_idx(CHANNEL_SIZE, 1.0);
    }

    #[test]
    #[should_panic(
        expected = "Cannot write to the provided channel: 4 as it is out of range of the number of channels: 4"
    )]
    fn panics_when_writing_to_invalid_channel() {
        const CHANNEL_SIZE: usize = 64;
        const NUM_CHANNELS: usize = 4;
        let mut input = [0.0; CHANNEL_SIZE * NUM_CHANNELS];
        let mut builder = ConvInputBuilder::new(CHANNEL_SIZE, &mut input);

        builder.channel(NUM_CHANNELS).write_at_idx(0, 1.0);
    }
}
