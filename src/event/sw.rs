/// Software events (`PERF_TYPE_SOFTWARE`), maintained by the kernel itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Software {
    CpuClock,
    TaskClock,

    PageFault,
    MinorPageFault,
    MajorPageFault,

    EmuFault,
    AlignFault,

    CtxSwitch,
    CgroupSwitch,

    Dummy,
    BpfOutput,
    CpuMigration,
}

super::selectors!(Software {
    CpuClock => (PERF_COUNT_SW_CPU_CLOCK, "cpu-clock"),
    TaskClock => (PERF_COUNT_SW_TASK_CLOCK, "task-clock"),
    PageFault => (PERF_COUNT_SW_PAGE_FAULTS, "page-faults"),
    CtxSwitch => (PERF_COUNT_SW_CONTEXT_SWITCHES, "context-switches"),
    CpuMigration => (PERF_COUNT_SW_CPU_MIGRATIONS, "cpu-migrations"),
    MinorPageFault => (PERF_COUNT_SW_PAGE_FAULTS_MIN, "minor-faults"),
    MajorPageFault => (PERF_COUNT_SW_PAGE_FAULTS_MAJ, "major-faults"),
    AlignFault => (PERF_COUNT_SW_ALIGNMENT_FAULTS, "alignment-faults"),
    EmuFault => (PERF_COUNT_SW_EMULATION_FAULTS, "emulation-faults"),
    Dummy => (PERF_COUNT_SW_DUMMY, "dummy"),
    BpfOutput => (PERF_COUNT_SW_BPF_OUTPUT, "bpf-output"),
    CgroupSwitch => (PERF_COUNT_SW_CGROUP_SWITCHES, "cgroup-switches"),
});
