use crate::subcmd;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "resp-eval")]
#[command(about = "呼吸运动肿瘤分割的 DICE 评分与质心位移分析工具集.")]
#[command(version, long_about = None)]
pub struct Cli {
    /// JSON 格式的分析参数文件, 覆盖默认的时相顺序、参考时相、阈值与容差。
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 输出调试日志。
    #[arg(long, short, global = true)]
    verbose: bool,

    /// 子命令。
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn run_program(&self) -> anyhow::Result<()> {
        utils::init_logger(self.verbose);
        let config = utils::load_config_or_default(self.config.as_deref())?;

        match self.command {
            Commands::Dice(ref v) => v.run(&config),
            Commands::Compare(ref v) => v.run(&config),
            Commands::Folder(ref v) => v.run(&config),
            Commands::Displacement(ref v) => v.run(&config),
            Commands::Magnitude(ref v) => v.run(&config),
            Commands::Check(ref v) => v.run(&config),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 计算两个分割文件的 DICE 系数（阈值 > 0.5）。
    Dice(subcmd::dice::Dice),
    /// 按结构批量比较两个模态/序列的分割，输出汇总表。
    Compare(subcmd::compare::Compare),
    /// 将目录中的每个分割与金标准比较，并附上 ITV 体积。
    Folder(subcmd::folder::Folder),
    /// 对目录中每张结构统计表计算相对位移，输出曲线与汇总表。
    Displacement(subcmd::displacement::Displacement),
    /// 多个结构的绝对位置模长曲线。
    Magnitude(subcmd::magnitude::Magnitude),
    /// 检查 header、体素对齐、连通分量，可输出投影预览图。
    Check(subcmd::check::Check),
}
