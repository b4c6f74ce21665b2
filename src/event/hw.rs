/// Generic hardware events (`PERF_TYPE_HARDWARE`).
///
/// Not every CPU model implements every event, attaching an unsupported
/// one is rejected by the kernel at attach time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hardware {
    CpuCycle,
    Instr,

    CacheAccess,
    CacheMiss,

    BranchInstr,
    BranchMiss,

    BusCycle,
    FrontendStalledCycle,
    BackendStalledCycle,
    RefCpuCycle,
}

super::selectors!(Hardware {
    CpuCycle => (PERF_COUNT_HW_CPU_CYCLES, "cycles"),
    Instr => (PERF_COUNT_HW_INSTRUCTIONS, "instructions"),
    CacheAccess => (PERF_COUNT_HW_CACHE_REFERENCES, "cache-references"),
    CacheMiss => (PERF_COUNT_HW_CACHE_MISSES, "cache-misses"),
    BranchInstr => (PERF_COUNT_HW_BRANCH_INSTRUCTIONS, "branch-instructions"),
    BranchMiss => (PERF_COUNT_HW_BRANCH_MISSES, "branch-misses"),
    BusCycle => (PERF_COUNT_HW_BUS_CYCLES, "bus-cycles"),
    FrontendStalledCycle => (PERF_COUNT_HW_STALLED_CYCLES_FRONTEND, "stalled-cycles-frontend"),
    BackendStalledCycle => (PERF_COUNT_HW_STALLED_CYCLES_BACKEND, "stalled-cycles-backend"),
    RefCpuCycle => (PERF_COUNT_HW_REF_CPU_CYCLES, "ref-cycles"),
});
