pub mod core;
pub mod store;
pub mod memory;
pub mod codec;
pub mod skiplist;
pub mod hashindex;
pub mod map;
pub mod records;
pub mod wal;

/*
┌──────────────────────────────────────────────────────────────────────────┐
│                        STRATADB STRUCT ARCHITECTURE                       │
└──────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── STORE LAYER ─────────────────────────────┐
│                                                                           │
│  trait Store                    ┌──────────────────┐ ┌─────────────────┐ │
│  • allocate(size) -> position   │ struct FileStore │ │ struct MmapStore│ │
│  • read/write at position       │ • positional I/O │ │ • memmap2 remap │ │
│  • commit/close/reset/delete    └──────────────────┘ └─────────────────┘ │
│  First 8 bytes: committed size  ┌──────────────────┐ ┌─────────────────┐ │
│  (fresh volume allocates at 8)  │struct MemoryStore│ │ struct Header   │ │
│                                 │ • Vec<u8>        │ │ • firstNode     │ │
│  struct BufferPool              └──────────────────┘ │ • recordCount   │ │
│  • acquire -> PooledBuffer (returns to pool on drop) │ • position (12B)│ │
│                                                      └─────────────────┘ │
└───────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── CODEC LAYER ─────────────────────────────┐
│                                                                           │
│  enum Value                     to_buffer / from_buffer                   │
│  • Null/Bool/Int/Long/ULong     • leading TypeTag per value               │
│  • Float/Double/String/Bytes    • recursive Object graphs                 │
│  • IntArray/LongArray/List      read_attribute: decode one field,         │
│  • Object(fields)                 skip the rest                           │
│                                                                           │
│  trait Streamable: entity ⇄ Value through serde derives                   │
└───────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── INDEX LAYER ─────────────────────────────┐
│                                                                           │
│  struct SkipNode (29B on disk)  struct SkipList                           │
│  • left/right/down/record       • search/insert/delete                    │
│    as 5-byte compact ints       • above/below/between -> references       │
│  • 8B key, 1B level             • coin-flip leveling, cap = load factor   │
│                                                                           │
│  struct HashMatrixNode (88B)    struct HashTrieIndex                      │
│  • position + 10 child slots    • crc32 digits route to shard skip lists  │
│                                 • DFS shard walk for full iteration       │
└───────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── MAP LAYER ───────────────────────────────┐
│                                                                           │
│  struct DiskMap                 struct MapFactory                         │
│  • put/get/remove               • registry is itself a DiskMap            │
│  • above/below/between          • get_map caches live instances           │
│  • getWithRecordId              • new_stateless_map (no locking)          │
│  • getAttributeWithRecordId     struct MapInstanceCache                   │
│  • long_size                    • LRU + idle-timeout flush/close          │
│                                                                           │
│  struct RecordInteractor<T>     IdentifierStrategy                        │
│  • save -> (old position, id)   • Direct / Sequence / Uuid                │
└───────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── WAL LAYER ───────────────────────────────┐
│                                                                           │
│  struct TransactionLog          recover_database(dir, predicate, handler) │
│  • [type][len][payload] frames  • replays <N>.wal in name order           │
│  • 20MB rotation                • fail-fast on a bad frame or apply       │
│  • Save=1 Delete=2              • predicate skips rejected operations     │
│    DeleteByQuery=3 UpdateByQuery=4                                        │
└───────────────────────────────────────────────────────────────────────────┘

  Database ──sizes from Config──> BufferPool / MapInstanceCache / TransactionLog
  MapFactory ──owns──> Store ──backs──> DiskMap ──shards──> SkipList
       │                                    │
       └──registers──> Header <──roots──────┘
  RecordInteractor ──binds──> DiskMap        TransactionLog ──replays──>
                                             RecoveryHandler
*/
