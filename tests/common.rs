use ewf_writer::{
    ChunkAccumulator, CompressionLevel, Compressor, EwfFormat, Format, MediaValues,
    MemorySegmentTable, NewChunkWriter, NullCompressor, WriteOptions,
};

pub fn options(media: MediaValues) -> WriteOptions {
    WriteOptions::default().media(media)
}

pub fn new_writer(options: WriteOptions) -> NewChunkWriter<MemorySegmentTable> {
    let state = options.build().expect("valid write options");
    NewChunkWriter::new(state, MemorySegmentTable::new(), Box::new(NullCompressor))
}

pub fn new_writer_with_compressor(
    options: WriteOptions,
    compressor: Box<dyn Compressor>,
) -> NewChunkWriter<MemorySegmentTable> {
    let state = options.build().expect("valid write options");
    NewChunkWriter::new(state, MemorySegmentTable::new(), compressor)
}

pub fn accumulator(options: WriteOptions) -> ChunkAccumulator<MemorySegmentTable> {
    ChunkAccumulator::new(new_writer(options))
}

pub fn e01_encase6(media: MediaValues) -> WriteOptions {
    options(media)
        .format(Format::Encase6)
        .ewf_format(EwfFormat::E01)
        .compression_level(CompressionLevel::None)
}
